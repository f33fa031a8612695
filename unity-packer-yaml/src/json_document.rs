//! Ordered JSON documents
//!
//! Project configuration, GUID stores and UPM `package.json` manifests are
//! JSON. They are loaded into the same ordered [`UnityValue`] tree used for
//! YAML metadata so the resolver can treat both alike.

use crate::constants::{GUID_STORE_JSON_INDENT, MANIFEST_JSON_INDENT};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::Path;
use tracing::debug;
use unity_packer_core::{PackerError, Result, UnityMap, UnityValue};

/// Load a JSON file into an ordered tree
pub fn load_json_file<P: AsRef<Path>>(path: P) -> Result<UnityValue> {
    let path = path.as_ref();
    debug!("Reading JSON from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| PackerError::file_io(path, e))?;
    load_json_str(&content, path)
}

/// Parse JSON text, reporting errors against `origin`
pub fn load_json_str<P: AsRef<Path>>(content: &str, origin: P) -> Result<UnityValue> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| PackerError::parse(origin, e.to_string()))?;
    Ok(from_json_value(value))
}

/// Convert a serde_json value into a document tree
pub fn from_json_value(value: Value) -> UnityValue {
    match value {
        Value::Null => UnityValue::Null,
        Value::Bool(b) => UnityValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => UnityValue::Integer(i),
            None => UnityValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => UnityValue::String(s),
        Value::Array(arr) => UnityValue::Array(arr.into_iter().map(from_json_value).collect()),
        Value::Object(obj) => UnityValue::Object(
            obj.into_iter()
                .map(|(k, v)| (k, from_json_value(v)))
                .collect::<UnityMap>(),
        ),
    }
}

fn to_pretty_string(value: &UnityValue, indent: &[u8]) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| PackerError::format(format!("Failed to write JSON: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| PackerError::format(format!("Invalid UTF-8 in JSON: {}", e)))
}

/// Pretty print with a two space indent, keeping key order
pub fn dump_json_pretty(value: &UnityValue) -> Result<String> {
    to_pretty_string(value, MANIFEST_JSON_INDENT)
}

/// Recursively sort the keys of every object
pub fn sort_keys(value: &UnityValue) -> UnityValue {
    match value {
        UnityValue::Object(obj) => {
            let mut sorted: UnityMap = obj.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
            sorted.sort_keys();
            UnityValue::Object(sorted)
        }
        UnityValue::Array(arr) => UnityValue::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Dump a GUID store: four space indent, sorted keys, no trailing whitespace
pub fn dump_guid_store(value: &UnityValue) -> Result<String> {
    let json = to_pretty_string(&sort_keys(value), GUID_STORE_JSON_INDENT)?;
    let mut output = String::with_capacity(json.len() + 1);
    for line in json.lines() {
        output.push_str(line.trim_end());
        output.push('\n');
    }
    Ok(output)
}
