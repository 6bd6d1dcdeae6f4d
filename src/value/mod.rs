// Value model for docschema
//
// Host documents and storage documents are both expressed with `Value`.
// Mappings are kept as ordered `(name, value)` entries so that a schema's
// declaration order survives into the output.

use std::ops::Index;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};

pub use self::attrs::AttrMap;
pub use self::record::Record;
pub use self::slot::Slot;

pub mod attrs;
pub mod json;
pub mod record;
pub mod slot;

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```
/// use docschema::{doc, Value};
///
/// let d = doc! { "name" => "hans", "age" => 3 };
/// assert_eq!(d.get("age"), Some(&Value::Int(3)));
/// ```
#[macro_export]
macro_rules! doc {
    () => { $crate::value::Document::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::value::Document::new();
        $( document.insert($key, $crate::value::Value::from($value)); )+
        document
    }};
}

/// A single value of a host or storage document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Text encoded with an explicit encoding
    Bytes(Bytes),
    /// Pure date; storage keeps these as midnight date-times
    Date(NaiveDate),
    /// Naive UTC date-time
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(Document),
    /// Mapping with attribute-style access, produced by dotted dict nodes
    Attrs(AttrMap),
    /// Mapping materialized by a schema's target shape
    Record(Record),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
            Value::Attrs(_) => "attrs",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the backing mapping of any mapping-shaped value.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Map(doc) => Some(doc),
            Value::Attrs(attrs) => Some(attrs.as_document()),
            Value::Record(record) => Some(record.fields()),
            _ => None,
        }
    }

    /// Consumes a mapping-shaped value into its backing mapping.
    pub fn into_document(self) -> Option<Document> {
        match self {
            Value::Map(doc) => Some(doc),
            Value::Attrs(attrs) => Some(attrs.into_document()),
            Value::Record(record) => Some(record.into_fields()),
            _ => None,
        }
    }

    /// Looks up `key` if this value is mapping-shaped.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_document().and_then(|doc| doc.get(key))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Map(doc)
    }
}

impl From<AttrMap> for Value {
    fn from(attrs: AttrMap) -> Self {
        Value::Attrs(attrs)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// An insertion-ordered mapping of field names to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a value, replacing an existing entry in place.
    ///
    /// Returns the previous value if `key` was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Appends without checking for an existing entry. Callers guarantee uniqueness.
    pub(crate) fn push(&mut self, key: String, value: Value) {
        self.entries.push((key, value));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl Index<&str> for Document {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(value) => value,
            None => panic!("no field named '{}' in document", key),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (key, value) in iter {
            doc.insert(key, value);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
