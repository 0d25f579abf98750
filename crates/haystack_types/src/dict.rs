//! Ordered tag dictionaries

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{Number, Ref, Value};

/// Insertion-ordered mapping from tag name to value.
///
/// Re-adding an existing tag replaces its value in place, so the first
/// insertion decides where a tag appears.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dict {
    tags: IndexMap<String, Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tag.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn add_marker(&mut self, name: impl Into<String>) -> &mut Self {
        self.tags.insert(name.into(), Value::Marker);
        self
    }

    /// Add a tag only when it is not present yet.
    pub fn add_missing(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        if !self.tags.contains_key(name) {
            self.tags.insert(name.to_string(), value.into());
        }
        self
    }

    /// Add every tag of `other`, replacing existing ones.
    pub fn merge(&mut self, other: &Dict) -> &mut Self {
        for (name, value) in other.iter() {
            self.tags.insert(name.to_string(), value.clone());
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.tags.shift_remove(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn missing(&self, name: &str) -> bool {
        !self.has(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.tags.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_ref(&self, name: &str) -> Option<&Ref> {
        self.get(name).and_then(Value::as_reference)
    }

    pub fn get_number(&self, name: &str) -> Option<&Number> {
        self.get(name).and_then(Value::as_number)
    }

    /// The `id` tag, if it holds a ref.
    pub fn id(&self) -> Option<&Ref> {
        self.get_ref("id")
    }

    pub fn dis(&self) -> Option<&str> {
        self.get_str("dis")
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.add(k, v);
        }
        dict
    }
}
