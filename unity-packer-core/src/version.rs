//! Plugin version parsing and ordering
//!
//! GUID stores are keyed by plugin version strings that are not always full
//! semantic versions ("1.2", "2.0.0-preview"). Missing components are padded
//! with zeros before parsing so that every key can be ordered.

use crate::constants::VALID_VERSION;
use crate::{PackerError, Result};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;

/// A parsed plugin version that keeps the string it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginVersion {
    raw: String,
    version: Version,
}

impl PluginVersion {
    /// Parse a version, padding missing minor/patch components
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let version = Version::parse(trimmed)
            .or_else(|_| Version::parse(&pad_components(trimmed)))
            .map_err(|e| PackerError::format(format!("Invalid version '{}': {}", raw, e)))?;
        Ok(Self {
            raw: raw.to_string(),
            version,
        })
    }

    /// The original string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> &Version {
        &self.version
    }
}

fn pad_components(raw: &str) -> String {
    let (core, suffix) = match raw.find(['-', '+']) {
        Some(index) => raw.split_at(index),
        None => (raw, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    format!("{}{}", parts.join("."), suffix)
}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check a version against the `major.minor.patch(-preview)` release format
pub fn is_valid_release_version(version: &str) -> bool {
    VALID_VERSION.is_match(version)
}
