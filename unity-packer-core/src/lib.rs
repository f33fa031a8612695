//! Unity Packer Core
//!
//! Core data structures shared by the Unity package exporter crates: the
//! ordered document tree, type-checked tree access, the error taxonomy and
//! the platform/label tables used when generating asset metadata.

pub mod constants;
pub mod error;
pub mod tree_access;
pub mod unity_value;
pub mod version;

// Re-export main types
pub use constants::*;
pub use error::{PackerError, Result};
pub use unity_value::{UnityMap, UnityValue};
pub use version::{PluginVersion, is_valid_release_version};

/// Convert path separators to POSIX style
pub fn posix_path<S: AsRef<str>>(path: S) -> String {
    path.as_ref().replace('\\', "/")
}
