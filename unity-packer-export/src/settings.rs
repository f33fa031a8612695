//! Export settings
//!
//! Replaces process wide flags with a value that is passed to every export
//! operation.

use unity_packer_archive::ArchiveOptions;
use unity_packer_core::DEFAULT_TIMESTAMP;

/// Settings shared by every package written in one export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Version of the plugin being exported
    pub plugins_version: Option<String>,
    /// Timestamp applied to metadata and archive members.
    /// A negative value uses each file's creation time, 0 does not force
    /// archive times.
    pub timestamp: i64,
    /// Owner recorded for archive members
    pub owner: String,
    /// Group recorded for archive members
    pub group: String,
    /// Use the tar executable when it is available
    pub use_tar: bool,
    /// Require a `major.minor.patch(-preview)` plugin version
    pub enforce_semver: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            plugins_version: None,
            timestamp: DEFAULT_TIMESTAMP,
            owner: "root".to_string(),
            group: "root".to_string(),
            use_tar: true,
            enforce_semver: true,
        }
    }
}

impl ExportSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugins_version<S: Into<String>>(mut self, version: S) -> Self {
        self.plugins_version = Some(version.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_ownership<O: Into<String>, G: Into<String>>(mut self, owner: O, group: G) -> Self {
        self.owner = owner.into();
        self.group = group.into();
        self
    }

    pub fn with_native_tar(mut self, use_tar: bool) -> Self {
        self.use_tar = use_tar;
        self
    }

    pub fn with_enforce_semver(mut self, enforce_semver: bool) -> Self {
        self.enforce_semver = enforce_semver;
        self
    }

    /// Archive options derived from these settings
    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions::new()
            .with_timestamp(self.timestamp)
            .with_ownership(self.owner.clone(), self.group.clone())
            .with_native_tar(self.use_tar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ExportSettings::default();
        assert_eq!(settings.timestamp, 1_480_838_400);
        assert_eq!(settings.owner, "root");
        assert!(settings.use_tar);
        assert!(settings.enforce_semver);
        assert!(settings.plugins_version.is_none());
    }

    #[test]
    fn test_archive_options() {
        let options = ExportSettings::new()
            .with_timestamp(-1)
            .with_ownership("builder", "staff")
            .with_native_tar(false)
            .archive_options();
        assert_eq!(options.forced_mtime(), None);
        assert_eq!(options.owner, "builder");
        assert_eq!(options.group, "staff");
        assert!(!options.use_tar);
    }
}
