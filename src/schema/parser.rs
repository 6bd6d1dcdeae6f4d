// JSON schema definition parser for docschema
//
// This module builds Schema objects from declarative JSON definitions, so a
// schema can live in a configuration file instead of code.

use std::collections::HashMap;

use serde_json::{Map, Value as Json};

use crate::internal::error::{Error, Result};
use crate::schema::boolean::BooleanNode;
use crate::schema::composite::{Schema, TargetShape, UnknownFields};
use crate::schema::containers::{DictNode, ListNode};
use crate::schema::filters::EqualTo;
use crate::schema::node::Node;
use crate::schema::numeric::{FloatNode, IntegerNode};
use crate::schema::string::{RegexpNode, StringNode, TextEncoding};
use crate::schema::temporal::{DateNode, DateTimeNode};
use crate::value::Value;

/// Configuration for the schema parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Reject field definitions that set both `default` and `required`
    pub reject_default_with_required: bool,
    /// Policy for schemas that do not set `unknown_fields` themselves
    pub unknown_fields: UnknownFields,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            reject_default_with_required: false,
            unknown_fields: UnknownFields::Drop,
        }
    }
}

/// Parser for JSON schema definitions
#[derive(Debug, Clone, Default)]
pub struct SchemaParser {
    config: ParserConfig,
    /// Custom type mappings (type name -> node template)
    custom_type_mappings: HashMap<String, Node>,
}

impl SchemaParser {
    /// Creates a new schema parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new schema parser with the given configuration
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            custom_type_mappings: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Adds a custom type. Fields of type `name` start from a copy of `node`.
    pub fn add_type_mapping(&mut self, name: &str, node: impl Into<Node>) {
        self.custom_type_mappings.insert(name.to_string(), node.into());
    }

    /// Parses a schema definition from JSON text
    pub fn parse_str(&self, text: &str) -> Result<Schema> {
        let json: Json = serde_json::from_str(text)
            .map_err(|err| Error::ParseError(format!("Invalid schema JSON: {}", err)))?;
        self.parse_schema(&json)
    }

    /// Parses a JSON schema definition into a Schema
    pub fn parse_schema(&self, json: &Json) -> Result<Schema> {
        let obj = match json {
            Json::Object(obj) => obj,
            _ => return Err(Error::SchemaError("Schema must be a JSON object".to_string())),
        };
        self.parse_schema_object(obj)
    }

    /// Parses a single field definition into a node
    pub fn parse_node(&self, json: &Json) -> Result<Node> {
        match json {
            Json::String(type_name) => self.parse_type(type_name, &Map::new()),
            Json::Object(obj) => {
                let type_name = self.get_string_field(obj, "type")?;
                let node = self.parse_type(&type_name, obj)?;
                self.apply_options(node, obj)
            }
            _ => Err(Error::SchemaError(format!(
                "Invalid field definition: {}, expected string or object",
                json
            ))),
        }
    }

    fn parse_schema_object(&self, obj: &Map<String, Json>) -> Result<Schema> {
        let fields = match obj.get("fields") {
            Some(Json::Object(fields)) => fields,
            Some(_) => return Err(Error::SchemaError("'fields' must be an object".to_string())),
            None => return Err(Error::SchemaError("Schema must specify 'fields'".to_string())),
        };

        let mut builder = Schema::builder();
        for (name, definition) in fields {
            let node = self.parse_node(definition).map_err(|err| match err {
                Error::SchemaError(msg) => Error::SchemaError(format!("{}: {}", name, msg)),
                other => other,
            })?;
            builder = builder.field(name, node);
        }

        if let Some(target) = self.get_optional_string(obj, "target")? {
            builder = builder.target(TargetShape::record(&target));
        }

        let unknown = match self.get_optional_string(obj, "unknown_fields")? {
            Some(policy) => policy.parse::<UnknownFields>()?,
            None => self.config.unknown_fields,
        };
        builder.unknown_fields(unknown).build()
    }

    /// Builds the node of a type, with its type-specific options
    fn parse_type(&self, type_name: &str, obj: &Map<String, Json>) -> Result<Node> {
        // Check for custom type mapping
        if let Some(custom) = self.custom_type_mappings.get(type_name) {
            return Ok(custom.clone());
        }

        let node = match type_name {
            "string" => {
                let mut node = StringNode::new();
                if let Some(encoding) = self.get_encoding(obj)? {
                    node = node.encoding(encoding);
                }
                if let Some(max_length) = self.get_max_length(obj)? {
                    node = node.max_length(max_length);
                }
                Node::from(node)
            }
            "regexp" => {
                let pattern = self.get_string_field(obj, "pattern")?;
                let mut node = RegexpNode::new(&pattern)?;
                if let Some(encoding) = self.get_encoding(obj)? {
                    node = node.encoding(encoding);
                }
                if let Some(max_length) = self.get_max_length(obj)? {
                    node = node.max_length(max_length);
                }
                Node::from(node)
            }
            "integer" => {
                let mut node = IntegerNode::new();
                if let Some(min) = self.get_optional_i64(obj, "min")? {
                    node = node.min(min);
                }
                if let Some(max) = self.get_optional_i64(obj, "max")? {
                    node = node.max(max);
                }
                Node::from(node)
            }
            "float" => {
                let mut node = FloatNode::new();
                if let Some(min) = self.get_optional_f64(obj, "min")? {
                    node = node.min(min);
                }
                if let Some(max) = self.get_optional_f64(obj, "max")? {
                    node = node.max(max);
                }
                Node::from(node)
            }
            "boolean" => Node::from(BooleanNode::new()),
            "date" => Node::from(DateNode::new()),
            "datetime" => {
                let ignore_tz = self.get_optional_bool(obj, "ignore_tz")?.unwrap_or(false);
                Node::from(DateTimeNode::new().ignore_tz(ignore_tz))
            }
            "list" => match obj.get("items") {
                Some(items) => Node::from(ListNode::of(self.parse_node(items)?)),
                None => {
                    return Err(Error::SchemaError("List must specify 'items'".to_string()))
                }
            },
            "dict" => {
                let mut node = DictNode::new();
                if let Some(values) = obj.get("values") {
                    node = node.values(self.parse_node(values)?);
                }
                if let Some(dotted) = self.get_optional_bool(obj, "dotted")? {
                    node = node.dotted(dotted);
                }
                Node::from(node)
            }
            "schema" => Node::from(self.parse_schema_object(obj)?),
            _ => return Err(Error::SchemaError(format!("Unknown type: {}", type_name))),
        };
        Ok(node)
    }

    /// Applies the options every node kind shares
    fn apply_options(&self, mut node: Node, obj: &Map<String, Json>) -> Result<Node> {
        let required = self.get_optional_bool(obj, "required")?.unwrap_or(false);
        let default = obj.get("default");

        if required && default.is_some() && self.config.reject_default_with_required {
            return Err(Error::SchemaError(
                "Field sets both 'default' and 'required'".to_string(),
            ));
        }

        if let Some(field) = self.get_optional_string(obj, "equal_to")? {
            node = node.on_serialize(EqualTo::field(field));
        }
        if let Some(default) = default {
            node = node.default_value(Value::from(default.clone()));
        }
        if required {
            node = node.required();
        }
        Ok(node)
    }

    fn get_max_length(&self, obj: &Map<String, Json>) -> Result<Option<usize>> {
        self.get_optional_u64(obj, "max_length")?
            .map(|max_length| {
                usize::try_from(max_length).map_err(|_| {
                    Error::SchemaError(format!("max_length {} is too large", max_length))
                })
            })
            .transpose()
    }

    fn get_encoding(&self, obj: &Map<String, Json>) -> Result<Option<TextEncoding>> {
        self.get_optional_string(obj, "encoding")?
            .map(|label| label.parse())
            .transpose()
    }

    /// Gets a required string field from a JSON object
    fn get_string_field(&self, obj: &Map<String, Json>, field: &str) -> Result<String> {
        self.get_optional_string(obj, field)?
            .ok_or_else(|| Error::SchemaError(format!("Missing required field: {}", field)))
    }

    fn get_optional_string(&self, obj: &Map<String, Json>, field: &str) -> Result<Option<String>> {
        match obj.get(field) {
            None => Ok(None),
            Some(Json::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Error::SchemaError(format!(
                "Field '{}' must be a string, got {}",
                field, other
            ))),
        }
    }

    fn get_optional_bool(&self, obj: &Map<String, Json>, field: &str) -> Result<Option<bool>> {
        match obj.get(field) {
            None => Ok(None),
            Some(Json::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Error::SchemaError(format!(
                "Field '{}' must be a boolean, got {}",
                field, other
            ))),
        }
    }

    fn get_optional_i64(&self, obj: &Map<String, Json>, field: &str) -> Result<Option<i64>> {
        match obj.get(field) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                Error::SchemaError(format!("Field '{}' must be an integer, got {}", field, value))
            }),
        }
    }

    fn get_optional_u64(&self, obj: &Map<String, Json>, field: &str) -> Result<Option<u64>> {
        match obj.get(field) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                Error::SchemaError(format!(
                    "Field '{}' must be a non-negative integer, got {}",
                    field, value
                ))
            }),
        }
    }

    fn get_optional_f64(&self, obj: &Map<String, Json>, field: &str) -> Result<Option<f64>> {
        match obj.get(field) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                Error::SchemaError(format!("Field '{}' must be a number, got {}", field, value))
            }),
        }
    }
}
