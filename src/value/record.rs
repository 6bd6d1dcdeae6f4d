use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::value::{Document, Value};

/// A deserialized mapping materialized through a schema's target shape.
///
/// A record always keeps the mapping it was built from, so it can be read
/// field by field and serialized again. Shapes built from a factory also
/// attach the typed instance the factory produced.
#[derive(Clone)]
pub struct Record {
    shape: Arc<str>,
    fields: Document,
    instance: Option<Arc<dyn Any + Send + Sync>>,
}

impl Record {
    pub fn new(shape: impl Into<Arc<str>>, fields: Document) -> Self {
        Self {
            shape: shape.into(),
            fields,
            instance: None,
        }
    }

    /// Attaches a typed instance built from the same fields.
    pub fn with_instance<T: Any + Send + Sync>(mut self, instance: T) -> Self {
        self.instance = Some(Arc::new(instance));
        self
    }

    /// Name of the target shape this record was built for.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn into_fields(self) -> Document {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// Returns the typed instance if one was attached and it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.as_deref().and_then(|instance| instance.downcast_ref::<T>())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("shape", &self.shape)
            .field("fields", &self.fields)
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}

// Instances are derived from the fields, so they take no part in equality.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.fields == other.fields
    }
}
