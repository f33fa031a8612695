//! Unity Packer YAML
//!
//! Order preserving document codec for the Unity package exporter, built on
//! serde_yaml and serde_json.
//!
//! # Examples
//!
//! ```rust
//! use unity_packer_yaml::{MetaLoader, MetaSerializer};
//!
//! let loader = MetaLoader::new();
//! let meta = loader.load_from_str("fileFormatVersion: 2\nlabels:\n- gvh\nuserData:\n")?;
//!
//! let yaml = MetaSerializer::new().serialize_to_string(&meta)?;
//! assert_eq!(yaml, "fileFormatVersion: 2\nlabels:\n- gvh\nuserData:\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export core types
pub use unity_packer_core::{PackerError, Result, UnityMap, UnityValue};

// Core modules
pub mod constants;
pub mod json_document;
pub mod meta_loader;
pub mod meta_serializer;

// Re-export main types
pub use json_document::{dump_guid_store, dump_json_pretty, load_json_file, load_json_str};
pub use meta_loader::MetaLoader;
pub use meta_serializer::MetaSerializer;
