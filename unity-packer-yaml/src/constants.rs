//! Constants for the document codec

// Re-export from unity-packer-core
pub use unity_packer_core::constants::*;

/// Indent used for nested mappings in `.meta` files
pub const META_INDENT_SIZE: usize = 2;

/// Indent used by `package.json`
pub const MANIFEST_JSON_INDENT: &[u8] = b"  ";

/// Indent used by GUID store files
pub const GUID_STORE_JSON_INDENT: &[u8] = b"    ";

/// Plain scalars YAML 1.1 resolves to booleans or null
pub const RESERVED_PLAIN_SCALARS: &[&str] = &[
    "~", "null", "Null", "NULL", "true", "True", "TRUE", "false", "False", "FALSE", "yes", "Yes",
    "YES", "no", "No", "NO", "on", "On", "ON", "off", "Off", "OFF", "y", "Y", "n", "N",
];
