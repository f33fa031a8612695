//! GUID database
//!
//! Resolves the GUID of every exported asset from a versioned GUID store so
//! an asset keeps its GUID across plugin releases.

use crate::asset::Asset;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};
use unity_packer_core::tree_access::get_str;
use unity_packer_core::{PackerError, PluginVersion, Result, UnityValue, posix_path};
use unity_packer_yaml::load_json_file;

/// Tracks every path associated with each GUID during an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateGuidChecker {
    paths_by_guid: BTreeMap<String, BTreeSet<String>>,
}

impl DuplicateGuidChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_guid_and_path(&mut self, guid: &str, path: &str) {
        self.paths_by_guid
            .entry(guid.to_string())
            .or_default()
            .insert(posix_path(path));
    }

    /// Fail if any GUID is associated with more than one path
    pub fn check_for_duplicates(&self) -> Result<()> {
        let conflicting: BTreeMap<String, BTreeSet<String>> = self
            .paths_by_guid
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(guid, paths)| (guid.clone(), paths.clone()))
            .collect();
        if conflicting.is_empty() {
            Ok(())
        } else {
            Err(PackerError::DuplicateGuids {
                paths_by_guid: conflicting,
            })
        }
    }
}

/// GUIDs by asset path for one plugin version
#[derive(Debug, Clone, Default)]
pub struct GuidDatabase {
    guids_by_path: HashMap<String, String>,
    checker: DuplicateGuidChecker,
}

impl GuidDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the database for `plugin_version` from a GUID store.
    ///
    /// GUIDs pinned at exactly `plugin_version` are used first. Paths missing
    /// from that version take the GUID of the newest older version that
    /// defines them. Without a version the database is empty, and a version
    /// that cannot be ordered only gets its pinned GUIDs.
    pub fn from_store(store: &UnityValue, plugin_version: Option<&str>) -> Result<Self> {
        let mut database = Self::new();
        let (Some(plugin_version), Some(versions)) = (plugin_version, store.as_object()) else {
            return Ok(database);
        };

        if let Some(pinned) = versions.get(plugin_version).and_then(UnityValue::as_object) {
            for (path, guid) in pinned {
                if let Some(guid) = guid.as_str() {
                    database.add_guid(path, guid);
                }
            }
        }

        let current = match PluginVersion::parse(plugin_version) {
            Ok(current) => current,
            Err(err) => {
                warn!(
                    "Using only the GUIDs pinned at {} since the version cannot be ordered: {}",
                    plugin_version, err
                );
                return Ok(database);
            }
        };
        let mut older: Vec<(PluginVersion, &UnityValue)> = versions
            .iter()
            .filter_map(|(version, guids)| match PluginVersion::parse(version) {
                Ok(parsed) => Some((parsed, guids)),
                Err(err) => {
                    warn!("Skipping GUIDs of unparseable version {}: {}", version, err);
                    None
                }
            })
            .filter(|(version, _)| version.semver() < current.semver())
            .collect();
        older.sort_by(|(a, _), (b, _)| b.cmp(a));

        for (version, guids) in older {
            let Some(guids) = guids.as_object() else {
                continue;
            };
            for (path, guid) in guids {
                let path = posix_path(path);
                if database.guids_by_path.contains_key(&path) {
                    continue;
                }
                if let Some(guid) = guid.as_str() {
                    debug!("Using GUID {} of {} from version {}", guid, path, version);
                    database.add_guid(&path, guid);
                }
            }
        }
        Ok(database)
    }

    /// Load a GUID store file and build the database for `plugin_version`
    pub fn load<P: AsRef<Path>>(path: P, plugin_version: Option<&str>) -> Result<Self> {
        let store = load_json_file(path)?;
        Self::from_store(&store, plugin_version)
    }

    /// Record the GUID of a path
    pub fn add_guid(&mut self, path: &str, guid: &str) {
        let path = posix_path(path);
        self.checker.add_guid_and_path(guid, &path);
        self.guids_by_path.insert(path, guid.to_string());
    }

    /// GUID of a path, if known
    pub fn guid(&self, path: &str) -> Option<&str> {
        self.guids_by_path
            .get(&posix_path(path))
            .map(String::as_str)
            .filter(|guid| !guid.is_empty())
    }

    /// GUID of a path, failing with a missing GUID error
    pub fn lookup(&self, path: &str) -> Result<String> {
        self.guid(path)
            .map(str::to_string)
            .ok_or_else(|| PackerError::missing_guids([posix_path(path)]))
    }

    /// Record the GUID of every asset.
    ///
    /// A GUID in the asset's metadata takes precedence over the database.
    /// Assets without any GUID are reported together, then duplicates are
    /// checked.
    pub fn read_guids_from_assets(&mut self, assets: &[Asset]) -> Result<()> {
        let mut missing = Vec::new();
        for asset in assets {
            let lookup = asset.filename_guid_lookup();
            let metadata = asset.importer_metadata();
            let guid = get_str(&metadata, "guid")
                .filter(|guid| !guid.is_empty())
                .map(str::to_string)
                .or_else(|| self.guid(lookup).map(str::to_string));
            match guid {
                Some(guid) => self.add_guid(lookup, &guid),
                None => missing.push(lookup.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(PackerError::missing_guids(missing));
        }
        self.check_duplicates()
    }

    /// Fail if a GUID was recorded for more than one path
    pub fn check_duplicates(&self) -> Result<()> {
        self.checker.check_for_duplicates()
    }

    pub fn len(&self) -> usize {
        self.guids_by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guids_by_path.is_empty()
    }
}
