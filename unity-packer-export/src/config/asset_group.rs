//! Asset groups
//!
//! An entry of a package's `imports` list: a set of paths exported with the
//! same importer settings.

use crate::asset::{Asset, metadata_path};
use crate::config::ConfigurationBlock;
use crate::metadata::{ImporterKind, add_labels, build_importer_metadata, merge_override};
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use unity_packer_core::tree_access::{get_str_or, get_string_list};
use unity_packer_core::{DEFAULT_CPU, DEFAULT_PLUGIN_PLATFORMS, PackerError, Result, UnityValue, posix_path};
use unity_packer_yaml::MetaLoader;
use walkdir::WalkDir;

const DEFAULT_IMPORTER: &str = "DefaultImporter";

/// Export settings for a group of paths in one package
#[derive(Debug, Clone)]
pub struct AssetGroup<'a> {
    json: &'a UnityValue,
    package_name: &'a str,
    package_labels: BTreeSet<String>,
}

impl ConfigurationBlock for AssetGroup<'_> {
    fn json(&self) -> &UnityValue {
        self.json
    }
}

impl<'a> AssetGroup<'a> {
    /// Create a group of `package_name` carrying the package's labels
    pub fn new(json: &'a UnityValue, package_name: &'a str, package_labels: BTreeSet<String>) -> Self {
        Self {
            json,
            package_name,
            package_labels,
        }
    }

    /// Name of the importer, `DefaultImporter` when not set
    pub fn importer(&self) -> &str {
        get_str_or(self.json, "importer", DEFAULT_IMPORTER)
    }

    pub fn importer_kind(&self) -> Result<ImporterKind> {
        ImporterKind::parse(self.importer()).ok_or_else(|| {
            PackerError::configuration(format!(
                "Unknown importer type {} for package {}, paths {:?}",
                self.importer(),
                self.package_name,
                self.paths()
            ))
        })
    }

    /// Labels of this group joined with the package labels
    pub fn labels(&self) -> BTreeSet<String> {
        let mut labels: BTreeSet<String> = get_string_list(self.json, "labels").into_iter().collect();
        labels.extend(self.package_labels.iter().cloned());
        labels
    }

    /// Path patterns relative to the assets directories
    pub fn paths(&self) -> BTreeSet<String> {
        get_string_list(self.json, "paths").into_iter().collect()
    }

    /// Platforms enabled for plugins
    pub fn platforms(&self) -> BTreeSet<String> {
        if self.json.get("platforms").is_some_and(|platforms| !platforms.is_null()) {
            get_string_list(self.json, "platforms").into_iter().collect()
        } else {
            DEFAULT_PLUGIN_PLATFORMS.iter().map(|platform| platform.to_string()).collect()
        }
    }

    pub fn cpu(&self) -> &str {
        get_str_or(self.json, "cpu", DEFAULT_CPU)
    }

    /// Metadata merged over every asset of this group
    pub fn override_metadata(&self) -> Result<UnityValue> {
        self.read_override("override_metadata")
    }

    /// Metadata merged over every asset of this group when exporting a UPM
    /// package
    pub fn override_metadata_upm(&self) -> Result<UnityValue> {
        self.read_override("override_metadata_upm")
    }

    fn read_override(&self, key: &str) -> Result<UnityValue> {
        match self.json.get(key) {
            None | Some(UnityValue::Null) => Ok(UnityValue::object()),
            Some(value @ UnityValue::Object(_)) => Ok(value.clone()),
            Some(UnityValue::String(yaml)) => {
                let parsed = MetaLoader::new().load_from_str(yaml).map_err(|e| {
                    PackerError::configuration(format!(
                        "Failed to parse {} of package {} ({})",
                        key, self.package_name, e
                    ))
                })?;
                match parsed {
                    UnityValue::Object(_) => Ok(parsed),
                    UnityValue::Null => Ok(UnityValue::object()),
                    other => Err(PackerError::configuration(format!(
                        "{} of package {} must be a mapping, found {}",
                        key,
                        self.package_name,
                        other.type_name()
                    ))),
                }
            }
            Some(other) => {
                warn!(
                    "Expected object instead of {} while reading key {}, ignoring value {}",
                    other.type_name(),
                    key,
                    other
                );
                Ok(UnityValue::object())
            }
        }
    }

    /// Importer metadata shared by the assets of this group
    pub fn importer_metadata(&self) -> Result<UnityValue> {
        let kind = self.importer_kind()?;
        let labels: Vec<String> = self.labels().into_iter().collect();
        build_importer_metadata(kind, &self.platforms(), self.cpu(), &labels).map_err(|err| match err {
            PackerError::ProjectConfiguration(message) => PackerError::configuration(format!(
                "{} for package {}, paths {:?}",
                message,
                self.package_name,
                self.paths()
            )),
            other => other,
        })
    }

    /// Find the files matched by this group.
    ///
    /// Patterns may name files, directories (searched recursively) or shell
    /// style globs. `.meta` files are never matched. A file found in more
    /// than one directory is taken from the last one. When a file has a
    /// `.meta` document next to it, that document is used with the group
    /// labels added instead of the generated metadata.
    pub fn find_assets<P: AsRef<Path>>(&self, assets_dirs: &[P], for_upm: bool) -> Result<Vec<Asset>> {
        let mut assets_dir_by_filename: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut unmatched = Vec::new();
        for pattern in self.paths() {
            let mut found = false;
            for assets_dir in assets_dirs {
                let assets_dir = assets_dir.as_ref();
                let assets_dir =
                    std::path::absolute(assets_dir).map_err(|e| PackerError::file_io(assets_dir, e))?;
                for path in self.glob_in_dir(&assets_dir, &pattern)? {
                    if path.is_dir() {
                        for entry in WalkDir::new(&path).sort_by_file_name() {
                            let entry = match entry {
                                Ok(entry) => entry,
                                Err(err) => {
                                    warn!("Failed to read {}: {}", path.display(), err);
                                    continue;
                                }
                            };
                            if entry.path().is_file() && !is_metadata_file(entry.path()) {
                                if let Some(relative) = relative_posix_path(entry.path(), &assets_dir) {
                                    assets_dir_by_filename.insert(relative, assets_dir.clone());
                                    found = true;
                                }
                            }
                        }
                    } else if !is_metadata_file(&path) {
                        if let Some(relative) = relative_posix_path(&path, &assets_dir) {
                            assets_dir_by_filename.insert(relative, assets_dir.clone());
                            found = true;
                        }
                    }
                }
            }
            if !found {
                unmatched.push(pattern);
            }
        }
        if !unmatched.is_empty() {
            warn!(
                "Package {} references paths that match no files {:?}",
                self.package_name, unmatched
            );
        }

        let importer_metadata = self.importer_metadata()?;
        let override_metadata = self.override_metadata()?;
        let override_metadata_upm = if for_upm {
            Some(self.override_metadata_upm()?)
        } else {
            None
        };
        let labels = self.labels();
        let loader = MetaLoader::new();

        let mut assets = Vec::with_capacity(assets_dir_by_filename.len());
        for (filename, assets_dir) in assets_dir_by_filename {
            let filename_absolute = assets_dir.join(&filename);
            let sidecar = metadata_path(&filename_absolute);
            let mut metadata = importer_metadata.clone();
            if sidecar.exists() {
                let mut existing = loader.load_file(&sidecar)?;
                if existing.is_truthy() {
                    debug!("Using existing metadata {}", sidecar.display());
                    add_labels(&mut existing, labels.iter().cloned());
                    metadata = existing;
                }
            }
            merge_override(&mut metadata, &override_metadata);
            if let Some(override_metadata_upm) = &override_metadata_upm {
                merge_override(&mut metadata, override_metadata_upm);
            }
            assets.push(Asset::new(&filename, filename_absolute, metadata));
        }
        Ok(Asset::sorted_by_filename(assets))
    }

    fn glob_in_dir(&self, assets_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let full_pattern = format!(
            "{}/{}",
            Pattern::escape(&posix_path(assets_dir.to_string_lossy())),
            pattern
        );
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };
        let paths = glob::glob_with(&full_pattern, options).map_err(|e| {
            PackerError::configuration(format!(
                "Invalid path {} in package {} ({})",
                pattern, self.package_name, e
            ))
        })?;
        Ok(paths
            .filter_map(|path| match path {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!("Failed to read {}: {}", err.path().display(), err);
                    None
                }
            })
            .collect())
    }
}

fn is_metadata_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "meta")
}

fn relative_posix_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let relative = posix_path(relative.to_string_lossy());
    if relative.is_empty() { None } else { Some(relative) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use unity_packer_core::tree_access::get_array;
    use unity_packer_yaml::load_json_str;

    fn group_json(json: &str) -> UnityValue {
        load_json_str(json, "group.json").unwrap()
    }

    fn touch(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn labels(asset: &Asset) -> Vec<String> {
        get_array(asset.importer_metadata_original(), "labels")
            .unwrap()
            .iter()
            .map(|label| label.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_defaults() {
        let json = group_json("{}");
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        assert_eq!(group.importer_kind().unwrap(), ImporterKind::Default);
        assert_eq!(group.cpu(), "AnyCPU");
        assert_eq!(group.platforms().len(), 5);
        assert!(group.platforms().contains("Standalone"));
        assert!(group.paths().is_empty());
        assert_eq!(group.override_metadata().unwrap(), UnityValue::object());
    }

    #[test]
    fn test_labels_include_package_labels() {
        let json = group_json(r#"{"labels": ["custom"]}"#);
        let package_labels: BTreeSet<String> = ["gvh".to_string()].into();
        let group = AssetGroup::new(&json, "Test.unitypackage", package_labels);
        assert_eq!(group.labels().into_iter().collect::<Vec<_>>(), ["custom", "gvh"]);
    }

    #[test]
    fn test_unknown_importer() {
        let json = group_json(r#"{"importer": "TextureImporter", "paths": ["a.png"]}"#);
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        let message = group.importer_metadata().unwrap_err().to_string();
        assert_eq!(
            message,
            "Unknown importer type TextureImporter for package Test.unitypackage, paths {\"a.png\"}"
        );
    }

    #[test]
    fn test_unknown_cpu_names_package() {
        let json = group_json(r#"{"importer": "PluginImporter", "cpu": "ARM", "paths": ["a.dll"]}"#);
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        let message = group.importer_metadata().unwrap_err().to_string();
        assert!(message.starts_with("Unknown cpu type ARM for package Test.unitypackage"));
    }

    #[test]
    fn test_override_metadata_from_yaml_string() {
        let json = group_json(r#"{"override_metadata": "PluginImporter:\n  isPreloaded: 1\n"}"#);
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        let metadata = group.override_metadata().unwrap();
        assert_eq!(
            metadata.get("PluginImporter").unwrap().get("isPreloaded"),
            Some(&UnityValue::Integer(1))
        );

        let json = group_json(r#"{"override_metadata": "- 1\n- 2\n"}"#);
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        assert!(group.override_metadata().is_err());
    }

    #[test]
    fn test_find_assets_files_directories_and_globs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Firebase/Plugins/App.dll", "dll");
        touch(dir.path(), "Firebase/Plugins/App.dll.meta", "");
        touch(dir.path(), "Firebase/Plugins/Auth.dll", "dll");
        touch(dir.path(), "Firebase/Editor/Tool.cs", "cs");
        touch(dir.path(), "Firebase/Editor/Sub/Other.cs", "cs");
        touch(dir.path(), "Firebase/Editor/Sub/Other.cs.meta", "");

        let json = group_json(
            r#"{"paths": ["Firebase/Plugins/*.dll", "Firebase/Editor", "Missing/*.cs"]}"#,
        );
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        let assets = group.find_assets(&[dir.path()], false).unwrap();
        let filenames: Vec<&str> = assets.iter().map(Asset::filename).collect();
        assert_eq!(
            filenames,
            [
                "Firebase/Editor/Sub/Other.cs",
                "Firebase/Editor/Tool.cs",
                "Firebase/Plugins/App.dll",
                "Firebase/Plugins/Auth.dll",
            ]
        );
        assert!(assets[1].filename_absolute().ends_with("Firebase/Editor/Tool.cs"));
    }

    #[test]
    fn test_find_assets_uses_existing_metadata() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.txt", "a");
        touch(
            dir.path(),
            "a.txt.meta",
            "fileFormatVersion: 2\nguid: 0123456789abcdef0123456789abcdef\nlabels:\n- mine\n",
        );
        touch(dir.path(), "b.txt", "b");

        let json = group_json(r#"{"paths": ["a.txt", "b.txt"], "labels": ["group"]}"#);
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        let assets = group.find_assets(&[dir.path()], false).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(
            assets[0].importer_metadata_original().get("guid"),
            Some(&UnityValue::from("0123456789abcdef0123456789abcdef"))
        );
        assert_eq!(labels(&assets[0]), ["group", "mine"]);
        assert!(assets[1].importer_metadata_original().contains_key("DefaultImporter"));
        assert_eq!(labels(&assets[1]), ["group"]);
    }

    #[test]
    fn test_find_assets_applies_upm_override_only_for_upm() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.txt", "a");
        let json = group_json(
            r#"{
                "paths": ["a.txt"],
                "override_metadata": {"DefaultImporter": {"userData": "legacy"}},
                "override_metadata_upm": {"DefaultImporter": {"userData": "upm"}}
            }"#,
        );
        let group = AssetGroup::new(&json, "Test.unitypackage", BTreeSet::new());
        let user_data = |for_upm: bool| {
            let assets = group.find_assets(&[dir.path()], for_upm).unwrap();
            assets[0]
                .importer_metadata_original()
                .get("DefaultImporter")
                .and_then(|importer| importer.get("userData"))
                .cloned()
        };
        assert_eq!(user_data(false), Some(UnityValue::from("legacy")));
        assert_eq!(user_data(true), Some(UnityValue::from("upm")));
    }
}
