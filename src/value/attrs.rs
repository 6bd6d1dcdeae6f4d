use std::ops::Index;

use crate::value::{Document, Value};

/// A mapping that offers named, dotted-path access next to keyed access.
///
/// Both styles read the same backing [`Document`]: `attrs["location"]` and
/// `attrs.attr("location")` return the same value, and
/// `attrs.attr("location.name")` walks into nested mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrMap {
    inner: Document,
}

impl AttrMap {
    pub fn new() -> Self {
        Self {
            inner: Document::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Keyed access to a top-level entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Named access; a dotted path descends through nested mappings.
    pub fn attr(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.inner.get(first)?, |current, segment| current.get(segment))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key, value)
    }

    /// Merges `other` into this map.
    ///
    /// Missing keys are added. A nested `AttrMap` receiving a mapping is
    /// merged recursively, a nested plain mapping receiving a mapping is
    /// updated key by key, and every other entry is replaced.
    pub fn merge(&mut self, other: Document) {
        for (key, incoming) in other {
            match self.inner.get_mut(&key) {
                None => self.inner.push(key, incoming),
                Some(Value::Attrs(nested)) if incoming.as_document().is_some() => {
                    if let Some(doc) = incoming.into_document() {
                        nested.merge(doc);
                    }
                }
                Some(Value::Map(existing)) if incoming.as_document().is_some() => {
                    if let Some(doc) = incoming.into_document() {
                        for (k, v) in doc {
                            existing.insert(k, v);
                        }
                    }
                }
                Some(current) => *current = incoming,
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter()
    }

    pub fn as_document(&self) -> &Document {
        &self.inner
    }

    pub fn into_document(self) -> Document {
        self.inner
    }
}

impl From<Document> for AttrMap {
    fn from(inner: Document) -> Self {
        Self { inner }
    }
}

impl Index<&str> for AttrMap {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        &self.inner[key]
    }
}
