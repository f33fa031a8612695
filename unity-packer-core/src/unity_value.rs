//! Unity value types
//!
//! This module defines the UnityValue enum used to hold every JSON and YAML
//! document the exporter reads or writes: project configuration, GUID stores
//! and asset metadata sidecars. Mapping order is preserved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping used for every object node
pub type UnityMap = IndexMap<String, UnityValue>;

/// A node in a JSON or YAML document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum UnityValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<UnityValue>),
    Object(UnityMap),
}

impl UnityValue {
    /// Create an empty object node
    pub fn object() -> Self {
        UnityValue::Object(UnityMap::new())
    }

    /// Build an object node from ordered key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<UnityValue>,
    {
        UnityValue::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, UnityValue::Null)
    }

    /// Check if the value is an object
    pub fn is_object(&self) -> bool {
        matches!(self, UnityValue::Object(_))
    }

    /// Truthiness as used by the metadata rules.
    ///
    /// Null, `false`, zero, the empty string and empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            UnityValue::Null => false,
            UnityValue::Bool(b) => *b,
            UnityValue::Integer(i) => *i != 0,
            UnityValue::Float(f) => *f != 0.0,
            UnityValue::String(s) => !s.is_empty(),
            UnityValue::Array(arr) => !arr.is_empty(),
            UnityValue::Object(obj) => !obj.is_empty(),
        }
    }

    /// Short name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            UnityValue::Null => "null",
            UnityValue::Bool(_) => "bool",
            UnityValue::Integer(_) => "integer",
            UnityValue::Float(_) => "float",
            UnityValue::String(_) => "string",
            UnityValue::Array(_) => "array",
            UnityValue::Object(_) => "object",
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            UnityValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            UnityValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            UnityValue::Float(f) => Some(*f),
            UnityValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            UnityValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&Vec<UnityValue>> {
        match self {
            UnityValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get mutable reference as array
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<UnityValue>> {
        match self {
            UnityValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&UnityMap> {
        match self {
            UnityValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get mutable reference as object
    pub fn as_object_mut(&mut self) -> Option<&mut UnityMap> {
        match self {
            UnityValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Look up a key when this node is an object
    pub fn get(&self, key: &str) -> Option<&UnityValue> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Mutable key lookup when this node is an object
    pub fn get_mut(&mut self, key: &str) -> Option<&mut UnityValue> {
        self.as_object_mut().and_then(|obj| obj.get_mut(key))
    }

    /// Check whether this node is an object containing `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.as_object().is_some_and(|obj| obj.contains_key(key))
    }

    /// Insert into an object node, returning false if this is not an object
    pub fn insert<K: Into<String>, V: Into<UnityValue>>(&mut self, key: K, value: V) -> bool {
        match self.as_object_mut() {
            Some(obj) => {
                obj.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Remove a key from an object node, keeping the order of the rest
    pub fn remove(&mut self, key: &str) -> Option<UnityValue> {
        self.as_object_mut().and_then(|obj| obj.shift_remove(key))
    }

    /// Get or create the object stored under `key`.
    ///
    /// A missing key or a non-object value is replaced with an empty object.
    /// Returns `None` when this node itself is not an object.
    pub fn entry_object(&mut self, key: &str) -> Option<&mut UnityValue> {
        let obj = self.as_object_mut()?;
        let slot = obj.entry(key.to_string()).or_insert_with(UnityValue::object);
        if !slot.is_object() {
            *slot = UnityValue::object();
        }
        Some(slot)
    }
}

impl fmt::Display for UnityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnityValue::Null => write!(f, "null"),
            UnityValue::Bool(b) => write!(f, "{}", b),
            UnityValue::Integer(i) => write!(f, "{}", i),
            UnityValue::Float(fl) => write!(f, "{}", fl),
            UnityValue::String(s) => write!(f, "{}", s),
            UnityValue::Array(arr) => {
                write!(f, "[")?;
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            UnityValue::Object(obj) => {
                write!(f, "{{")?;
                for (i, (key, value)) in obj.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Conversion implementations
impl From<bool> for UnityValue {
    fn from(b: bool) -> Self {
        UnityValue::Bool(b)
    }
}

impl From<i32> for UnityValue {
    fn from(i: i32) -> Self {
        UnityValue::Integer(i as i64)
    }
}

impl From<i64> for UnityValue {
    fn from(i: i64) -> Self {
        UnityValue::Integer(i)
    }
}

impl From<f64> for UnityValue {
    fn from(f: f64) -> Self {
        UnityValue::Float(f)
    }
}

impl From<String> for UnityValue {
    fn from(s: String) -> Self {
        UnityValue::String(s)
    }
}

impl From<&str> for UnityValue {
    fn from(s: &str) -> Self {
        UnityValue::String(s.to_string())
    }
}

impl From<Vec<UnityValue>> for UnityValue {
    fn from(arr: Vec<UnityValue>) -> Self {
        UnityValue::Array(arr)
    }
}

impl From<Vec<String>> for UnityValue {
    fn from(arr: Vec<String>) -> Self {
        UnityValue::Array(arr.into_iter().map(UnityValue::String).collect())
    }
}

impl From<UnityMap> for UnityValue {
    fn from(obj: UnityMap) -> Self {
        UnityValue::Object(obj)
    }
}

impl<T: Into<UnityValue>> From<Option<T>> for UnityValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(UnityValue::Null, Into::into)
    }
}
