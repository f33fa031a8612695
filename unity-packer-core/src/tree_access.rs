//! Type-checked access to document trees
//!
//! Project files, GUID stores and metadata sidecars are loosely typed. The
//! helpers here read a key from a node and only hand back the value when it
//! has the expected shape. A value of the wrong type is logged and treated as
//! absent, so a malformed field degrades to its default instead of aborting
//! an export.

use crate::{UnityMap, UnityValue};
use tracing::warn;

fn lookup<'a>(node: &'a UnityValue, key: &str) -> Option<&'a UnityValue> {
    match node.get(key) {
        Some(UnityValue::Null) | None => None,
        Some(value) => Some(value),
    }
}

fn mismatch(key: &str, expected: &str, found: &UnityValue) {
    warn!(
        "Expected {} instead of {} while reading key {}, ignoring value {}",
        expected,
        found.type_name(),
        key,
        found
    );
}

/// Read a string value
pub fn get_str<'a>(node: &'a UnityValue, key: &str) -> Option<&'a str> {
    let value = lookup(node, key)?;
    match value.as_str() {
        Some(s) => Some(s),
        None => {
            mismatch(key, "string", value);
            None
        }
    }
}

/// Read a string value or fall back to `default`
pub fn get_str_or<'a>(node: &'a UnityValue, key: &str, default: &'a str) -> &'a str {
    get_str(node, key).unwrap_or(default)
}

/// Read an integer value. Booleans are accepted as 0/1.
pub fn get_i64(node: &UnityValue, key: &str) -> Option<i64> {
    let value = lookup(node, key)?;
    match value {
        UnityValue::Integer(i) => Some(*i),
        UnityValue::Bool(b) => Some(i64::from(*b)),
        _ => {
            mismatch(key, "integer", value);
            None
        }
    }
}

/// Read an integer value or fall back to `default`
pub fn get_i64_or(node: &UnityValue, key: &str, default: i64) -> i64 {
    get_i64(node, key).unwrap_or(default)
}

/// Read a boolean value. Integers are accepted using their truthiness.
pub fn get_bool(node: &UnityValue, key: &str) -> Option<bool> {
    let value = lookup(node, key)?;
    match value {
        UnityValue::Bool(b) => Some(*b),
        UnityValue::Integer(i) => Some(*i != 0),
        _ => {
            mismatch(key, "bool", value);
            None
        }
    }
}

/// Read a list value
pub fn get_array<'a>(node: &'a UnityValue, key: &str) -> Option<&'a Vec<UnityValue>> {
    let value = lookup(node, key)?;
    match value.as_array() {
        Some(arr) => Some(arr),
        None => {
            mismatch(key, "array", value);
            None
        }
    }
}

/// Read a mapping value
pub fn get_object<'a>(node: &'a UnityValue, key: &str) -> Option<&'a UnityMap> {
    let value = lookup(node, key)?;
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            mismatch(key, "object", value);
            None
        }
    }
}

/// Read a list of strings, skipping items that are not strings
pub fn get_string_list(node: &UnityValue, key: &str) -> Vec<String> {
    let Some(items) = get_array(node, key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                mismatch(key, "string item", item);
                None
            }
        })
        .collect()
}

/// Set `key` on a mapping node. `None` removes the key.
///
/// Nodes that are not mappings are left untouched.
pub fn set_value(node: &mut UnityValue, key: &str, value: Option<UnityValue>) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    match value {
        Some(value) => {
            obj.insert(key.to_string(), value);
        }
        None => {
            obj.shift_remove(key);
        }
    }
}
