use std::fmt;

use thiserror::Error;

/// Unified error type for the docschema library.
///
/// Conversion failures raised while a document is walked are carried by
/// [`Invalid`]; the other variants describe problems found while a schema is
/// being assembled or while typed output is produced.
#[derive(Error, Debug)]
pub enum Error {
    /// A document was rejected by a node.
    #[error("Invalid Data: {0}")]
    Invalid(#[from] Invalid),

    /// Error related to schema assembly (duplicate fields, bad patterns, rejected definitions).
    #[error("Schema Error: {0}")]
    SchemaError(String),

    /// A schema definition could not be read as JSON.
    #[error("Parse Error: {0}")]
    ParseError(String),

    /// Deserialized output could not be turned into the requested type.
    #[error("Shape Error: {0}")]
    ShapeError(String),
}

/// A specialized `Result` type for docschema operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ShapeError(err.to_string())
    }
}

/// A failed conversion, attributed to the node that rejected the value.
///
/// `node` names the kind of the rejecting node (`"Integer"`, `"Schema"`) or
/// filter (`"EqualTo"`). `field` is the name the owning schema gave that
/// node, and `path` locates it from the root of the document: schemas push
/// field names and lists push element indexes while the error travels up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct Invalid {
    node: String,
    field: Option<String>,
    path: Vec<String>,
    message: String,
}

impl Invalid {
    /// Creates a new failure for the node kind `node`.
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            field: None,
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Kind of the node (or filter) that rejected the value.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Field name of the rejecting node, if it belongs to a schema.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Human-readable reason.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Path segments from the document root down to the rejecting node.
    pub fn segments(&self) -> &[String] {
        &self.path
    }

    /// Dotted path from the document root, e.g. `links.1.url`.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Records the field name of the node, keeping one set by a deeper node.
    pub(crate) fn with_field(mut self, name: Option<&str>) -> Self {
        if self.field.is_none() {
            self.field = name.map(str::to_string);
        }
        self
    }

    /// Prefixes the path with the segment of the enclosing container.
    pub(crate) fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.node, self.message)
        } else {
            write!(f, "{} ({}): {}", self.path(), self.node, self.message)
        }
    }
}
