// JSON bridge for the value model
//
// `Value` serializes through serde so that deserialized documents can be
// handed to typed structs, and converts from `serde_json::Value` so that
// documents and schema defaults can be written as JSON.

use serde::ser::{Serialize, Serializer};

use crate::internal::error::Result;
use crate::value::{Document, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Date(d) => serializer.collect_str(&d.format(DATE_FORMAT)),
            Value::DateTime(dt) => serializer.collect_str(&dt.format(DATETIME_FORMAT)),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(doc) => doc.serialize(serializer),
            Value::Attrs(attrs) => attrs.as_document().serialize(serializer),
            Value::Record(record) => record.fields().serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX and every fractional number
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Converts to JSON. Dates become ISO-8601 text and bytes become arrays.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
