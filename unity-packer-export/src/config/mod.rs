//! Declarative export configuration
//!
//! A project document lists packages and build configurations:
//!
//! ```json
//! {
//!   "packages": [
//!     {
//!       "name": "FirebaseApp.unitypackage",
//!       "imports": [{"importer": "PluginImporter", "paths": ["Plugins/*.dll"]}],
//!       "includes": ["Common.unitypackage"],
//!       "manifest_path": "Firebase/Editor"
//!     }
//!   ],
//!   "builds": [{"name": "default"}]
//! }
//! ```
//!
//! Every block may carry a `sections` list. A block without sections is
//! always enabled, otherwise it is enabled when one of its sections is
//! selected.

pub mod asset_group;
pub mod build;
pub mod package;
pub mod project;

pub use asset_group::AssetGroup;
pub use build::BuildConfiguration;
pub use package::PackageConfiguration;
pub use project::ProjectConfiguration;

use std::collections::BTreeSet;
use unity_packer_core::UnityValue;
use unity_packer_core::tree_access::get_string_list;

/// A configuration block read from the project document
pub trait ConfigurationBlock {
    /// Raw document of this block
    fn json(&self) -> &UnityValue;

    /// Sections that enable this block
    fn sections(&self) -> BTreeSet<String> {
        get_string_list(self.json(), "sections").into_iter().collect()
    }

    /// Whether this block is enabled for the `selected` sections
    fn is_enabled(&self, selected: &BTreeSet<String>) -> bool {
        sections_enabled(&self.sections(), selected)
    }
}

/// A block is enabled when it names no sections or one of them is selected
pub fn sections_enabled(sections: &BTreeSet<String>, selected: &BTreeSet<String>) -> bool {
    sections.is_empty() || !sections.is_disjoint(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_sections_enabled() {
        assert!(sections_enabled(&set(&[]), &set(&[])));
        assert!(sections_enabled(&set(&[]), &set(&["x"])));
        assert!(!sections_enabled(&set(&["x"]), &set(&[])));
        assert!(sections_enabled(&set(&["x", "y"]), &set(&["y", "z"])));
        assert!(!sections_enabled(&set(&["x"]), &set(&["z"])));
    }
}
