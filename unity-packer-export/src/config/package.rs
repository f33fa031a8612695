//! Package configuration
//!
//! A package names an exported archive, the asset groups it imports and the
//! packages whose assets it includes.

use crate::asset::Asset;
use crate::config::{AssetGroup, ConfigurationBlock, ProjectConfiguration};
use crate::labels::package_labels;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use unity_packer_core::tree_access::{get_array, get_i64_or, get_object, get_str, get_string_list};
use unity_packer_core::{PackerError, Result, UnityValue};

/// One exported package of a project
#[derive(Debug, Clone, PartialEq)]
pub struct PackageConfiguration {
    json: UnityValue,
    name: String,
}

impl ConfigurationBlock for PackageConfiguration {
    fn json(&self) -> &UnityValue {
        &self.json
    }
}

impl PackageConfiguration {
    /// Parse a package. Fails when the package has no name.
    pub fn from_json(json: UnityValue) -> Result<Self> {
        let name = get_str(&json, "name")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PackerError::configuration("Package found with no name"))?;
        Ok(Self { json, name })
    }

    /// Filename of the exported `.unitypackage`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its extension
    pub fn package_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(index) if index > 0 && !self.name[index..].contains('/') => &self.name[..index],
            _ => &self.name,
        }
    }

    /// Whether the package is exported as a `.unitypackage`
    pub fn export(&self) -> bool {
        get_i64_or(&self.json, "export", 1) == 1
    }

    /// Whether the package is exported as a UPM tarball
    pub fn export_upm(&self) -> bool {
        get_i64_or(&self.json, "export_upm", 0) == 1
    }

    /// Directory of the legacy manifest inside the package
    pub fn manifest_path(&self) -> Option<&str> {
        get_str(&self.json, "manifest_path").filter(|path| !path.is_empty())
    }

    /// Manifest fields shared by both export formats
    pub fn common_manifest(&self) -> Option<&UnityValue> {
        get_object(&self.json, "common_manifest")?;
        self.json.get("common_manifest")
    }

    /// UPM package name, e.g. `com.google.firebase.app`
    pub fn common_package_name(&self) -> Option<&str> {
        self.common_manifest()
            .and_then(|manifest| get_str(manifest, "name"))
            .filter(|name| !name.is_empty())
    }

    /// Human readable name, the package name when not configured
    pub fn common_package_display_name(&self) -> &str {
        self.common_manifest()
            .and_then(|manifest| get_str(manifest, "display_name"))
            .unwrap_or_else(|| self.package_name())
    }

    /// Description as a single string. A list of strings is concatenated.
    pub fn common_package_description(&self) -> Option<String> {
        let description = self.common_manifest()?.get("description")?;
        let description = match description {
            UnityValue::Array(lines) => lines
                .iter()
                .map(|line| match line {
                    UnityValue::String(line) => line.clone(),
                    other => other.to_string(),
                })
                .collect::<String>(),
            UnityValue::String(description) => description.clone(),
            UnityValue::Null => return None,
            other => other.to_string(),
        };
        (!description.is_empty()).then_some(description)
    }

    /// `upm_package_config.manifest`
    pub fn upm_manifest(&self) -> Option<&UnityValue> {
        let config = self.json.get("upm_package_config")?;
        get_object(config, "manifest")?;
        config.get("manifest")
    }

    /// Filename of the UPM tarball, `<common name>-<version>.tgz`
    pub fn tarball_name(&self, version: Option<&str>) -> Option<String> {
        let name = self.common_package_name()?;
        let version = version.filter(|version| !version.is_empty())?;
        Some(format!("{}-{}.tgz", name, version))
    }

    /// Path of a file configured under `key` (`readme`, `changelog`,
    /// `license` or `documentation`)
    pub fn configured_file(&self, key: &str) -> Option<&str> {
        get_str(&self.json, key).filter(|path| !path.is_empty())
    }

    /// Expressions matching the start of excluded export paths
    pub fn exclude_paths(&self) -> Result<Vec<Regex>> {
        get_string_list(&self.json, "exclude_paths")
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
                    PackerError::configuration(format!(
                        "Failed to compile exclude path '{}' for package {} ({})",
                        pattern, self.name, e
                    ))
                })
            })
            .collect()
    }

    /// Labels added to every asset of this package
    pub fn labels(&self, project: &ProjectConfiguration) -> BTreeSet<String> {
        package_labels(project.version()).into_iter().collect()
    }

    /// Asset groups of this package
    pub fn imports(&self, project: &ProjectConfiguration) -> Vec<AssetGroup<'_>> {
        let labels = self.labels(project);
        get_array(&self.json, "imports")
            .map(|imports| {
                imports
                    .iter()
                    .map(|import| AssetGroup::new(import, &self.name, labels.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Packages included by this package, transitively
    pub fn includes<'p>(&self, project: &'p ProjectConfiguration) -> Result<Vec<&'p PackageConfiguration>> {
        let mut visiting = vec![self.name.clone()];
        Ok(self
            .collect_includes(project, true, &mut visiting)?
            .into_values()
            .collect())
    }

    /// Packages named in this package's `includes` list
    pub fn direct_includes<'p>(&self, project: &'p ProjectConfiguration) -> Result<Vec<&'p PackageConfiguration>> {
        let mut visiting = vec![self.name.clone()];
        Ok(self
            .collect_includes(project, false, &mut visiting)?
            .into_values()
            .collect())
    }

    fn collect_includes<'p>(
        &self,
        project: &'p ProjectConfiguration,
        recursive: bool,
        visiting: &mut Vec<String>,
    ) -> Result<IndexMap<String, &'p PackageConfiguration>> {
        let mut included: IndexMap<String, &'p PackageConfiguration> = IndexMap::new();
        let mut missing = Vec::new();
        for include_name in get_string_list(&self.json, "includes") {
            let Some(package) = project.package(&include_name) else {
                missing.push(include_name);
                continue;
            };
            included.insert(package.name.clone(), package);
            if recursive && !visiting.contains(&package.name) {
                visiting.push(package.name.clone());
                let nested = package.collect_includes(project, true, visiting);
                visiting.pop();
                included.extend(nested?);
            }
        }
        if !missing.is_empty() {
            return Err(PackerError::configuration(format!(
                "{} includes missing packages {:?}",
                self.name, missing
            )));
        }
        Ok(included)
    }

    /// Fail if this package includes itself through its includes.
    /// `parents` holds the chain of packages that led to this one.
    pub fn check_circular_references(&self, project: &ProjectConfiguration, parents: &mut Vec<String>) -> Result<()> {
        if parents.contains(&self.name) {
            return Err(PackerError::configuration(format!(
                "Circular package inclusion detected when checking {} which is included by [{}]",
                self.name,
                parents.join(" --> ")
            )));
        }
        for include in self.direct_includes(project)? {
            parents.push(self.name.clone());
            let result = include.check_circular_references(project, parents);
            parents.pop();
            result?;
        }
        Ok(())
    }

    /// Find every asset exported by this package.
    ///
    /// Assets of included packages are added unless exporting a UPM package.
    /// The same file with different metadata in two packages is an error
    /// when `check_for_duplicates` is set, otherwise the first one wins.
    /// Excluded paths are removed and the result is sorted by filename.
    pub fn find_assets<P: AsRef<Path>>(
        &self,
        project: &ProjectConfiguration,
        assets_dirs: &[P],
        check_for_duplicates: bool,
        for_upm: bool,
    ) -> Result<Vec<Asset>> {
        let mut assets_by_package_name: IndexMap<String, Vec<Asset>> = IndexMap::new();
        for group in self.imports(project) {
            if group.is_enabled(project.selected_sections()) {
                let found = group.find_assets(assets_dirs, for_upm)?;
                assets_by_package_name
                    .entry(self.name.clone())
                    .or_default()
                    .extend(found);
            }
        }
        if !for_upm {
            for package in self.includes(project)? {
                debug!("{} including assets from {}", self.name, package.name);
                let found = package.find_assets(project, assets_dirs, false, false)?;
                assets_by_package_name
                    .entry(package.name.clone())
                    .or_default()
                    .extend(found);
            }
        }

        let mut package_and_assets_by_filename: IndexMap<String, Vec<(String, Asset)>> = IndexMap::new();
        for (package_name, assets) in assets_by_package_name {
            for asset in assets {
                package_and_assets_by_filename
                    .entry(asset.filename().to_string())
                    .or_default()
                    .push((package_name.clone(), asset));
            }
        }

        let mut conflicts = Vec::new();
        for (filename, package_and_assets) in &package_and_assets_by_filename {
            let mut differing: BTreeSet<&str> = BTreeSet::new();
            for pair in package_and_assets.windows(2) {
                let (previous_package, previous_asset) = &pair[0];
                let (package_name, asset) = &pair[1];
                if previous_asset.importer_metadata() != asset.importer_metadata() {
                    differing.insert(previous_package.as_str());
                    differing.insert(package_name.as_str());
                }
            }
            if !differing.is_empty() {
                conflicts.push(format!(
                    "File {} imported with different import settings in packages {:?}",
                    filename,
                    differing.into_iter().collect::<Vec<_>>()
                ));
            }
        }
        if check_for_duplicates && !conflicts.is_empty() {
            return Err(PackerError::configuration(conflicts.join("\n")));
        }

        let exclude_paths = self.exclude_paths()?;
        let found: Vec<Asset> = Asset::sorted_by_filename(
            package_and_assets_by_filename
                .into_values()
                .filter_map(|package_and_assets| package_and_assets.into_iter().next())
                .map(|(_, asset)| asset),
        )
        .into_iter()
        .filter(|asset| !exclude_paths.iter().any(|exclude| exclude.is_match(asset.filename())))
        .collect();
        debug!(
            "Found assets for package {}: {:?}",
            self.name,
            found.iter().map(Asset::filename).collect::<Vec<_>>()
        );
        Ok(found)
    }
}
