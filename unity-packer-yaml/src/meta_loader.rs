//! Asset metadata loader based on serde_yaml
//!
//! Reads `.meta` sidecar files into an order preserving [`UnityValue`] tree
//! so that user-authored fields survive a load/modify/dump cycle.

use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use unity_packer_core::{PackerError, Result, UnityMap, UnityValue};

/// Loader for Unity `.meta` YAML documents
pub struct MetaLoader;

impl MetaLoader {
    /// Create a new metadata loader
    pub fn new() -> Self {
        Self
    }

    /// Load metadata from a reader
    pub fn load_from_reader<R: Read>(&self, mut reader: R) -> Result<UnityValue> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| PackerError::format(format!("Failed to read input: {}", e)))?;
        self.load_from_str(&content)
            .map_err(|e| PackerError::format(format!("YAML parsing error: {}", e)))
    }

    /// Load metadata from a string. Only the first document is used.
    pub fn load_from_str(&self, yaml_str: &str) -> std::result::Result<UnityValue, serde_yaml::Error> {
        let first = serde_yaml::Deserializer::from_str(yaml_str)
            .next()
            .map(Value::deserialize)
            .transpose()?;
        Ok(first.map(|value| convert_value(&value)).unwrap_or_default())
    }

    /// Load a metadata file, naming the file in any error
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<UnityValue> {
        let path = path.as_ref();
        debug!("Loading metadata from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| PackerError::file_io(path, e))?;
        self.load_from_str(&content)
            .map_err(|e| PackerError::parse(path, e.to_string()))
    }
}

impl Default for MetaLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a serde_yaml value into a document tree
pub fn convert_value(value: &Value) -> UnityValue {
    match value {
        Value::Null => UnityValue::Null,
        Value::Bool(b) => UnityValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                UnityValue::Integer(i)
            } else {
                UnityValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => UnityValue::String(s.clone()),
        Value::Sequence(seq) => UnityValue::Array(seq.iter().map(convert_value).collect()),
        Value::Mapping(mapping) => {
            let mut obj = UnityMap::with_capacity(mapping.len());
            for (key, value) in mapping {
                obj.insert(mapping_key(key), convert_value(value));
            }
            UnityValue::Object(obj)
        }
        Value::Tagged(tagged) => convert_value(&tagged.value),
    }
}

fn mapping_key(key: &Value) -> String {
    match key {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => mapping_key(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
