use crate::value::{Document, Value};

/// A value as seen by a node: either supplied or absent.
///
/// Absence is distinct from [`Value::Null`]: a caller that stores an explicit
/// null supplied a value, a caller that left the field out did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    #[default]
    Absent,
    Present(Value),
}

impl Slot {
    pub fn is_absent(&self) -> bool {
        matches!(self, Slot::Absent)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Slot::Present(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Slot::Present(value) => Some(value),
            Slot::Absent => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Slot::Present(value) => Some(value),
            Slot::Absent => None,
        }
    }

    /// Looks up `key` in a present mapping-shaped value.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.as_value().and_then(|value| value.get(key))
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Present(value)
    }
}

impl From<Option<Value>> for Slot {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Slot::Present(value),
            None => Slot::Absent,
        }
    }
}

impl From<Document> for Slot {
    fn from(doc: Document) -> Self {
        Slot::Present(Value::Map(doc))
    }
}
