// Node pipeline for docschema
//
// Every node, whatever its kind, converts a value in the same order for both
// directions: bootstrap the whole document, run the direction's filters, fill
// in the default, check `required`, then hand the value to the kind-specific
// conversion hook.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::internal::error::Invalid;
use crate::schema::filters::Filter;
use crate::value::{Slot, Value};

/// Result of a conversion step.
pub type ConvertResult<T> = std::result::Result<T, Invalid>;

/// Which way a document is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host document to storage document
    Serialize,
    /// Storage document to host document
    Deserialize,
}

/// Extra values threaded through every filter and conversion hook of a call.
///
/// Lets filters reach things that are not part of the document, e.g. the
/// name of the collection a uniqueness check should look at.
#[derive(Debug, Clone, Default)]
pub struct Context {
    extras: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }
}

/// A configured default: a literal or a zero-argument producer.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn producer(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        DefaultValue::Producer(Arc::new(f))
    }

    /// Produces a fresh value; literals are cloned so calls never share state.
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Literal(value)
    }
}

/// The conversion behaviour of one kind of node.
///
/// Both hooks receive the value after filters, default and required check
/// have run. The provided implementations pass the value through unchanged.
pub trait NodeKind: fmt::Debug + Send + Sync {
    /// Kind name reported in [`Invalid`] errors.
    fn type_name(&self) -> &'static str;

    fn do_serialize(
        &self,
        node: &NodeConfig,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Slot> {
        let _ = (node, data, ctx);
        Ok(value)
    }

    fn do_deserialize(
        &self,
        node: &NodeConfig,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Slot> {
        let _ = (node, data, ctx);
        Ok(value)
    }
}

/// Configuration shared by every node kind.
#[derive(Clone, Default)]
pub struct NodeConfig {
    name: Option<String>,
    on_serialize: Vec<Arc<dyn Filter>>,
    on_deserialize: Vec<Arc<dyn Filter>>,
    default: Option<DefaultValue>,
    required: bool,
}

impl NodeConfig {
    /// Field name assigned by the owning schema.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn filters(&self, direction: Direction) -> &[Arc<dyn Filter>] {
        match direction {
            Direction::Serialize => &self.on_serialize,
            Direction::Deserialize => &self.on_deserialize,
        }
    }

    /// Builds a failure attributed to this node.
    pub fn invalid(&self, kind: &str, message: impl Into<String>) -> Invalid {
        Invalid::new(kind, message).with_field(self.name())
    }

    /// Runs the pipeline for `kind` in the given direction.
    pub(crate) fn run(
        &self,
        kind: &dyn NodeKind,
        direction: Direction,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Slot> {
        // the root call passes the document itself as the value
        let root;
        let data = if data.is_absent() {
            root = value.clone();
            &root
        } else {
            data
        };

        let mut value = value;
        for filter in self.filters(direction) {
            value = filter
                .apply(value, data, ctx)
                .map_err(|err| err.with_field(self.name()))?;
        }

        if value.is_absent() {
            if let Some(default) = &self.default {
                value = Slot::Present(default.resolve());
            }
        }

        if value.is_absent() && self.required {
            return Err(self.invalid(kind.type_name(), "required data missing"));
        }

        let converted = match direction {
            Direction::Serialize => kind.do_serialize(self, value, data, ctx),
            Direction::Deserialize => kind.do_deserialize(self, value, data, ctx),
        };
        converted.map_err(|err| err.with_field(self.name()))
    }

    /// Warns when the node has both a default and `required = true`.
    /// Returns whether it warned.
    pub(crate) fn warn_unreachable_required(&self) -> bool {
        let unreachable = self.required && self.default.is_some();
        if unreachable {
            warn!(
                field = self.name().unwrap_or("<unnamed>"),
                "node has a default and required = true; the required check can never fire"
            );
        }
        unreachable
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |filters: &[Arc<dyn Filter>]| -> Vec<String> {
            filters.iter().map(|filter| filter.name().to_string()).collect()
        };
        f.debug_struct("NodeConfig")
            .field("name", &self.name)
            .field("on_serialize", &names(&self.on_serialize))
            .field("on_deserialize", &names(&self.on_deserialize))
            .field("default", &self.default)
            .field("required", &self.required)
            .finish()
    }
}

/// A configured node: shared configuration plus the conversion of its kind.
///
/// Nodes are built once and then only read; cloning a node is cheap and the
/// kind is shared between the clones.
#[derive(Clone)]
pub struct Node {
    config: NodeConfig,
    kind: Arc<dyn NodeKind>,
}

impl Node {
    pub fn new<K: NodeKind + 'static>(kind: K) -> Self {
        Self {
            config: NodeConfig::default(),
            kind: Arc::new(kind),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn kind(&self) -> &dyn NodeKind {
        self.kind.as_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn name(&self) -> Option<&str> {
        self.config.name()
    }

    pub fn is_required(&self) -> bool {
        self.config.required
    }

    /// Marks the node as required in both directions.
    pub fn required(mut self) -> Self {
        self.config.required = true;
        self
    }

    /// Uses `value` (cloned per call) when no value is supplied.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.config.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Calls `produce` when no value is supplied.
    pub fn default_with(mut self, produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.config.default = Some(DefaultValue::producer(produce));
        self
    }

    /// Appends a filter to the serialize chain.
    pub fn on_serialize(mut self, filter: impl Filter + 'static) -> Self {
        self.config.on_serialize.push(Arc::new(filter));
        self
    }

    /// Appends a filter to the deserialize chain.
    pub fn on_deserialize(mut self, filter: impl Filter + 'static) -> Self {
        self.config.on_deserialize.push(Arc::new(filter));
        self
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        self.config.name = Some(name.to_string());
        self
    }

    /// Serializes a root value; the value doubles as the whole document.
    pub fn serialize(&self, value: impl Into<Slot>) -> ConvertResult<Slot> {
        self.serialize_with(value.into(), &Slot::Absent, &Context::default())
    }

    /// Deserializes a root value; the value doubles as the whole document.
    pub fn deserialize(&self, value: impl Into<Slot>) -> ConvertResult<Slot> {
        self.deserialize_with(value.into(), &Slot::Absent, &Context::default())
    }

    pub fn serialize_with(&self, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        self.convert(Direction::Serialize, value, data, ctx)
    }

    pub fn deserialize_with(&self, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        self.convert(Direction::Deserialize, value, data, ctx)
    }

    pub(crate) fn convert(
        &self,
        direction: Direction,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Slot> {
        self.config.run(self.kind.as_ref(), direction, value, data, ctx)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish()
    }
}

/// Node configuration methods for anything convertible into a [`Node`].
///
/// Lets kind values be configured in place:
/// `StringNode::new().required()`.
pub trait IntoNode: Into<Node> + Sized {
    fn into_node(self) -> Node {
        self.into()
    }

    fn required(self) -> Node {
        self.into_node().required()
    }

    fn default_value(self, value: impl Into<Value>) -> Node {
        self.into_node().default_value(value)
    }

    fn default_with(self, produce: impl Fn() -> Value + Send + Sync + 'static) -> Node {
        self.into_node().default_with(produce)
    }

    fn on_serialize(self, filter: impl Filter + 'static) -> Node {
        self.into_node().on_serialize(filter)
    }

    fn on_deserialize(self, filter: impl Filter + 'static) -> Node {
        self.into_node().on_deserialize(filter)
    }
}

impl<T: Into<Node>> IntoNode for T {}
