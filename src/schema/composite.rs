// Schema composite for docschema
//
// A schema is an ordered list of named child nodes. Serializing walks the
// children in declaration order and assembles a mapping; deserializing does
// the same and then hands the mapping to the target shape, if one is bound.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::internal::error::{Error, Invalid, Result};
use crate::schema::node::{Context, ConvertResult, Direction, Node, NodeConfig, NodeKind};
use crate::value::{AttrMap, Document, Record, Slot, Value};

/// What a schema does with input keys it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Leave them out of the output
    #[default]
    Drop,
    /// Copy them verbatim after the declared fields
    Keep,
    /// Fail the call
    Reject,
}

impl UnknownFields {
    pub fn label(&self) -> &'static str {
        match self {
            UnknownFields::Drop => "drop",
            UnknownFields::Keep => "keep",
            UnknownFields::Reject => "reject",
        }
    }
}

impl std::str::FromStr for UnknownFields {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drop" => Ok(UnknownFields::Drop),
            "keep" => Ok(UnknownFields::Keep),
            "reject" => Ok(UnknownFields::Reject),
            _ => Err(Error::SchemaError(format!("Unknown field policy: {}", s))),
        }
    }
}

type Materialize = dyn Fn(Document) -> ConvertResult<Value> + Send + Sync;

/// Builds the deserialized value of a schema from its assembled mapping.
#[derive(Clone)]
pub struct TargetShape {
    name: Arc<str>,
    build: Arc<Materialize>,
}

impl TargetShape {
    /// A [`Record`] tagged with `name`.
    pub fn record(name: &str) -> Self {
        let shape: Arc<str> = Arc::from(name);
        let tag = Arc::clone(&shape);
        Self {
            name: shape,
            build: Arc::new(move |doc| Ok(Value::Record(Record::new(Arc::clone(&tag), doc)))),
        }
    }

    /// An [`AttrMap`] with keyed and named access.
    pub fn attrs() -> Self {
        Self {
            name: Arc::from("attrs"),
            build: Arc::new(|doc| Ok(Value::Attrs(AttrMap::from(doc)))),
        }
    }

    /// A [`Record`] that also carries the instance `factory` builds from the
    /// mapping. Read it back with [`Record::downcast_ref`].
    pub fn build<T, F>(name: &str, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Document) -> ConvertResult<T> + Send + Sync + 'static,
    {
        let shape: Arc<str> = Arc::from(name);
        let tag = Arc::clone(&shape);
        Self {
            name: shape,
            build: Arc::new(move |doc| {
                let instance = factory(&doc)?;
                Ok(Value::Record(Record::new(Arc::clone(&tag), doc).with_instance(instance)))
            }),
        }
    }

    /// Like [`TargetShape::build`], with serde building `T` from the mapping.
    pub fn serde<T>(name: &str) -> Self
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        let shape = name.to_string();
        Self::build(name, move |doc: &Document| {
            serde_json::to_value(doc)
                .and_then(serde_json::from_value::<T>)
                .map_err(|err| Invalid::new("Schema", format!("cannot build {}: {}", shape, err)))
        })
    }

    /// Any value `factory` makes of the mapping.
    pub fn with<F>(name: &str, factory: F) -> Self
    where
        F: Fn(Document) -> ConvertResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            build: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn materialize(&self, doc: Document) -> ConvertResult<Value> {
        (self.build)(doc)
    }
}

impl fmt::Debug for TargetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetShape").field(&self.name).finish()
    }
}

/// An ordered set of named child nodes.
///
/// ```
/// use docschema::{IntoNode, ListNode, Schema, StringNode};
///
/// let schema = Schema::builder()
///     .field("name", StringNode::new().required())
///     .field("tags", ListNode::of(StringNode::new()))
///     .build()
///     .unwrap();
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Node)>,
    target: Option<TargetShape>,
    unknown: UnknownFields,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.fields.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn field(&self, name: &str) -> Option<&Node> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, node)| node)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn target(&self) -> Option<&TargetShape> {
        self.target.as_ref()
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown
    }

    /// Converts a host document into its storage form.
    pub fn serialize(&self, value: impl Into<Slot>) -> ConvertResult<Value> {
        self.serialize_with(value, &Context::default())
    }

    /// Converts a storage document into its host form.
    pub fn deserialize(&self, value: impl Into<Slot>) -> ConvertResult<Value> {
        self.deserialize_with(value, &Context::default())
    }

    pub fn serialize_with(&self, value: impl Into<Slot>, ctx: &Context) -> ConvertResult<Value> {
        self.root(Direction::Serialize, value.into(), ctx)
    }

    pub fn deserialize_with(&self, value: impl Into<Slot>, ctx: &Context) -> ConvertResult<Value> {
        self.root(Direction::Deserialize, value.into(), ctx)
    }

    /// Deserializes and hands the result to serde to build a `T`.
    pub fn deserialize_as<T: DeserializeOwned>(&self, value: impl Into<Slot>) -> Result<T> {
        let value = self.deserialize(value)?;
        Ok(serde_json::from_value(value.to_json()?)?)
    }

    fn root(&self, direction: Direction, value: Slot, ctx: &Context) -> ConvertResult<Value> {
        debug!(?direction, fields = self.fields.len(), "converting document");
        let config = NodeConfig::default();
        let result = config
            .run(self, direction, value, &Slot::Absent, ctx)
            .and_then(|slot| {
                slot.into_value()
                    .ok_or_else(|| Invalid::new(self.type_name(), "required data missing"))
            });
        if let Err(err) = &result {
            debug!(error = %err, "document rejected");
        }
        result
    }

    fn convert(
        &self,
        direction: Direction,
        node: &NodeConfig,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Document> {
        let mut input = match value {
            Slot::Absent => return Err(node.invalid(self.type_name(), "required data missing")),
            Slot::Present(value) => {
                let found = value.type_name();
                value.into_document().ok_or_else(|| {
                    node.invalid(self.type_name(), format!("expected a mapping, got {}", found))
                })?
            }
        };

        let mut output = Document::with_capacity(self.fields.len());
        for (name, child) in &self.fields {
            let sub_value = Slot::from(input.remove(name));
            trace!(field = %name, kind = child.type_name(), present = sub_value.is_present(), "converting field");
            let converted = child
                .convert(direction, sub_value, data, ctx)
                .map_err(|err| err.within(name.clone()))?;
            if let Some(value) = converted.into_value() {
                output.push(name.clone(), value);
            }
        }

        // whatever is left in the input was not declared
        match self.unknown {
            UnknownFields::Drop => {}
            UnknownFields::Keep => {
                for (key, value) in input {
                    output.push(key, value);
                }
            }
            UnknownFields::Reject => {
                if let Some(key) = input.keys().next() {
                    return Err(node
                        .invalid(self.type_name(), format!("unknown field '{}'", key))
                        .within(key));
                }
            }
        }
        Ok(output)
    }
}

impl NodeKind for Schema {
    fn type_name(&self) -> &'static str {
        "Schema"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        let output = self.convert(Direction::Serialize, node, value, data, ctx)?;
        Ok(Slot::Present(Value::Map(output)))
    }

    fn do_deserialize(&self, node: &NodeConfig, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        let output = self.convert(Direction::Deserialize, node, value, data, ctx)?;
        let value = match &self.target {
            Some(shape) => {
                trace!(shape = shape.name(), "materializing target shape");
                shape
                    .materialize(output)
                    .map_err(|err| err.with_field(node.name()))?
            }
            None => Value::Map(output),
        };
        Ok(Slot::Present(value))
    }
}

impl_into_node!(Schema);

/// Assembles a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, Node)>,
    inherited: HashSet<String>,
    target: Option<TargetShape>,
    unknown: UnknownFields,
    problems: Vec<String>,
}

impl SchemaBuilder {
    /// Adds a field. Reusing the name of an inherited field replaces that
    /// field in place.
    pub fn field(mut self, name: &str, node: impl Into<Node>) -> Self {
        let node = node.into().named(name);
        if name.is_empty() {
            self.problems.push("Field name must not be empty".to_string());
            return self;
        }
        node.config().warn_unreachable_required();
        match self.fields.iter().position(|(field, _)| field == name) {
            Some(index) if self.inherited.remove(name) => self.fields[index].1 = node,
            Some(_) => self.problems.push(format!("Duplicate field name: {}", name)),
            None => self.fields.push((name.to_string(), node)),
        }
        self
    }

    /// Starts from the fields of `base`, in its order.
    pub fn extend(mut self, base: &Schema) -> Self {
        for (name, node) in &base.fields {
            if self.fields.iter().any(|(field, _)| field == name) {
                self.problems.push(format!("Duplicate field name: {}", name));
                continue;
            }
            self.inherited.insert(name.clone());
            self.fields.push((name.clone(), node.clone()));
        }
        self
    }

    pub fn target(mut self, shape: TargetShape) -> Self {
        self.target = Some(shape);
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown = policy;
        self
    }

    pub fn build(self) -> Result<Schema> {
        if let Some(problem) = self.problems.into_iter().next() {
            return Err(Error::SchemaError(problem));
        }
        Ok(Schema {
            fields: self.fields,
            target: self.target,
            unknown: self.unknown,
        })
    }
}
