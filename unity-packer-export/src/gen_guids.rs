//! GUID store maintenance
//!
//! A GUID store maps plugin versions to the GUIDs of the asset paths
//! introduced or changed in that version:
//!
//! ```json
//! {
//!     "1.0.0": {
//!         "Firebase/Plugins/Firebase.App.dll": "8e9fb6a2b2d14ba0b9a5bc9e6c8e3d51"
//!     }
//! }
//! ```
//!
//! New asset paths get a random GUID in the version they are added to. Paths
//! already known by the version or an older one keep their GUID.

use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use unity_packer_core::{GUID_PATTERN, PackerError, PluginVersion, Result, UnityMap, UnityValue};
use unity_packer_yaml::{dump_guid_store, load_json_str};
use uuid::Uuid;

/// Version used when none is given
pub const DEFAULT_GUIDS_VERSION: &str = "1.0.0";

/// Generate a random GUID as 32 lowercase hex digits
pub fn new_guid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// GUIDs by asset path for every plugin version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuidStore {
    guids_by_version: IndexMap<String, UnityMap>,
}

impl GuidStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a GUID store document.
    ///
    /// Every version must map to an object whose values are 32 digit hex
    /// GUIDs.
    pub fn from_value(value: &UnityValue) -> Result<Self> {
        let mut store = Self::new();
        let versions = match value {
            UnityValue::Null => return Ok(store),
            UnityValue::Object(versions) => versions,
            other => {
                return Err(PackerError::configuration(format!(
                    "GUID store must be an object of versions, found {}",
                    other.type_name()
                )));
            }
        };
        for (version, guids_by_path) in versions {
            let UnityValue::Object(guids_by_path) = guids_by_path else {
                return Err(PackerError::configuration(format!(
                    "Version {} contains invalid GUID object {:?}",
                    version, guids_by_path
                )));
            };
            for (path, guid) in guids_by_path {
                match guid.as_str() {
                    Some(guid) if GUID_PATTERN.is_match(guid) => {}
                    _ => {
                        return Err(PackerError::InvalidGuid {
                            version: version.clone(),
                            path: path.clone(),
                            guid: guid.as_str().map_or_else(|| format!("{:?}", guid), str::to_string),
                        });
                    }
                }
            }
            store.guids_by_version.insert(version.clone(), guids_by_path.clone());
        }
        Ok(store)
    }

    /// Parse and validate GUID store JSON. Blank content is an empty store.
    pub fn from_json_str<P: AsRef<Path>>(content: &str, origin: P) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        Self::from_value(&load_json_str(content, origin)?)
    }

    /// Load an existing GUID store file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PackerError::configuration(format!(
                "Could not find the guids file ({}) to modify. If you wish to start a new guids file at this path, please create the empty file first.",
                path.display()
            )));
        }
        let content = fs::read_to_string(path).map_err(|e| PackerError::file_io(path, e))?;
        Self::from_json_str(&content, path)
    }

    /// GUIDs recorded for exactly `version`
    pub fn guids(&self, version: &str) -> Option<&UnityMap> {
        self.guids_by_version.get(version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.guids_by_version.keys().map(String::as_str)
    }

    /// Versions in ascending order. Versions that do not parse are left out.
    fn sorted_versions(&self) -> Vec<PluginVersion> {
        let mut versions: Vec<PluginVersion> = self
            .guids_by_version
            .keys()
            .filter_map(|version| match PluginVersion::parse(version) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!("Ignoring GUIDs of unparseable version {}: {}", version, err);
                    None
                }
            })
            .collect();
        versions.sort();
        versions
    }

    /// Remove entries that repeat the GUID an older version already assigns
    /// to the same path. Returns the number of entries removed.
    pub fn remove_duplicate_guids(&mut self) -> usize {
        let versions = self.sorted_versions();
        let mut removed = 0;
        for (index, version) in versions.iter().enumerate() {
            let older = &versions[..index];
            let duplicates: Vec<String> = self.guids_by_version[version.as_str()]
                .iter()
                .filter(|(path, guid)| {
                    older.iter().rev().any(|previous| {
                        self.guids_by_version[previous.as_str()]
                            .get(path.as_str())
                            .is_some_and(|previous_guid| previous_guid == *guid)
                    })
                })
                .map(|(path, _)| path.clone())
                .collect();
            if let Some(guids_by_path) = self.guids_by_version.get_mut(version.as_str()) {
                for path in &duplicates {
                    debug!("Removing duplicate GUID of {} from version {}", path, version);
                    guids_by_path.shift_remove(path);
                }
            }
            removed += duplicates.len();
        }
        removed
    }

    /// Every asset path known at `version` or older, with the GUID of the
    /// newest version that defines it
    pub fn all_asset_paths(&self, version: &str) -> Result<IndexMap<String, String>> {
        let max_version = PluginVersion::parse(version)?;
        let mut all_guids_by_path = IndexMap::new();
        for current in self.sorted_versions().iter().rev() {
            if current.semver() > max_version.semver() {
                continue;
            }
            for (path, guid) in &self.guids_by_version[current.as_str()] {
                if let Some(guid) = guid.as_str() {
                    all_guids_by_path
                        .entry(path.clone())
                        .or_insert_with(|| guid.to_string());
                }
            }
        }
        Ok(all_guids_by_path)
    }

    /// Assign GUIDs to `asset_paths` in `version`.
    ///
    /// Paths unknown to the version and every older version get a new GUID.
    /// With `generate_new_guids` every path gets a new GUID. Returns the
    /// paths that were assigned a GUID.
    pub fn generate_guids<S: AsRef<str>>(
        &mut self,
        version: &str,
        asset_paths: &[S],
        generate_new_guids: bool,
    ) -> Result<Vec<String>> {
        let known = self.all_asset_paths(version)?;
        let asset_paths: BTreeSet<&str> = asset_paths.iter().map(AsRef::as_ref).collect();
        let guids_by_path = self.guids_by_version.entry(version.to_string()).or_default();
        let mut assigned = Vec::new();
        for asset_path in asset_paths {
            if generate_new_guids || !known.contains_key(asset_path) {
                let guid = new_guid();
                debug!("Assigning GUID {} to {} in version {}", guid, asset_path, version);
                guids_by_path.insert(asset_path.to_string(), UnityValue::String(guid));
                assigned.push(asset_path.to_string());
            }
        }
        Ok(assigned)
    }

    pub fn to_value(&self) -> UnityValue {
        UnityValue::Object(
            self.guids_by_version
                .iter()
                .map(|(version, guids)| (version.clone(), UnityValue::Object(guids.clone())))
                .collect(),
        )
    }

    /// Write the store with sorted keys and a four space indent
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = dump_guid_store(&self.to_value())?;
        fs::write(path, content).map_err(|e| PackerError::file_io(path, e))
    }
}

/// Arguments of a GUID maintenance run
#[derive(Debug, Clone)]
pub struct GenGuidsRequest {
    /// Existing GUID store to update
    pub guids_file: PathBuf,
    /// Version the paths are introduced in
    pub version: String,
    /// Asset paths within the plugin
    pub asset_paths: Vec<String>,
    /// Replace the GUIDs of paths that already have one
    pub generate_new_guids: bool,
}

/// Update a GUID store file, returning the paths that were assigned a GUID
pub fn run_gen_guids(request: &GenGuidsRequest) -> Result<Vec<String>> {
    let mut store = GuidStore::load(&request.guids_file)?;
    let removed = store.remove_duplicate_guids();
    if removed > 0 {
        info!("Removed {} duplicate GUIDs from {}", removed, request.guids_file.display());
    }
    let assigned = store.generate_guids(&request.version, &request.asset_paths, request.generate_new_guids)?;
    store.write(&request.guids_file)?;
    info!(
        "Assigned {} GUIDs for version {} in {}",
        assigned.len(),
        request.version,
        request.guids_file.display()
    );
    Ok(assigned)
}
