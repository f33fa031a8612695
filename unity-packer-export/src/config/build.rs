//! Build configurations
//!
//! A build enables extra sections and renames exported packages, so one
//! project can export several variants of the same packages.

use crate::config::ConfigurationBlock;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use unity_packer_core::tree_access::{get_array, get_str, get_str_or, get_string_list};
use unity_packer_core::{PackerError, Result, UnityValue};

const UNNAMED_BUILD: &str = "<unnamed>";

lazy_static! {
    static ref BACKREFERENCE: Regex = Regex::new(r"\\(?:(\d+)|g<(\w+)>)|\$").expect("valid regex");
}

/// Rewrite `\1` and `\g<name>` group references to `${1}` and `${name}`,
/// escaping literal dollar signs.
fn expand_backreferences(replacement: &str) -> String {
    BACKREFERENCE
        .replace_all(replacement, |captures: &Captures<'_>| {
            match captures.get(1).or_else(|| captures.get(2)) {
                Some(group) => format!("${{{}}}", group.as_str()),
                None => "$$".to_string(),
            }
        })
        .into_owned()
}

/// Sections and package renames applied when exporting
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    json: UnityValue,
    replacements: Vec<(Regex, String)>,
}

impl ConfigurationBlock for BuildConfiguration {
    fn json(&self) -> &UnityValue {
        &self.json
    }
}

impl BuildConfiguration {
    /// Parse a build. Fails when a package name replacement does not
    /// compile.
    pub fn from_json(json: UnityValue) -> Result<Self> {
        let mut build = Self {
            json,
            replacements: Vec::new(),
        };
        let mut replacements = Vec::new();
        for match_replacement in get_array(&build.json, "package_name_replacements")
            .into_iter()
            .flatten()
        {
            let (Some(pattern), Some(replacement)) = (
                get_str(match_replacement, "match").filter(|pattern| !pattern.is_empty()),
                get_str(match_replacement, "replacement"),
            ) else {
                continue;
            };
            let regex = Regex::new(pattern).map_err(|e| {
                PackerError::configuration(format!(
                    "Failed to compile package name replacement regular expression '{}' for build config {} ({})",
                    pattern,
                    build.name(),
                    e
                ))
            })?;
            replacements.push((regex, expand_backreferences(replacement)));
        }
        build.replacements = replacements;
        Ok(build)
    }

    /// Name used when logging
    pub fn name(&self) -> &str {
        get_str_or(&self.json, "name", UNNAMED_BUILD)
    }

    /// Sections enabled while exporting with this build
    pub fn enabled_sections(&self) -> BTreeSet<String> {
        get_string_list(&self.json, "enabled_sections").into_iter().collect()
    }

    pub fn package_name_replacements(&self) -> &[(Regex, String)] {
        &self.replacements
    }

    /// Apply every replacement, in order, to `package_name`
    pub fn apply_package_name_replacements(&self, package_name: &str) -> String {
        self.replacements
            .iter()
            .fold(package_name.to_string(), |name, (regex, replacement)| {
                regex.replace_all(&name, replacement.as_str()).into_owned()
            })
    }

    /// Map package names to the filenames they are exported to.
    ///
    /// `filenames_by_package` holds the filename each package would use
    /// without renames. Fails when two packages end up with the same
    /// filename.
    pub fn create_package_name_map(
        &self,
        filenames_by_package: &IndexMap<String, String>,
    ) -> Result<IndexMap<String, String>> {
        let mut package_name_map = IndexMap::with_capacity(filenames_by_package.len());
        let mut packages_by_filename: IndexMap<String, Vec<String>> = IndexMap::new();
        for (package_name, filename) in filenames_by_package {
            let filename = self.apply_package_name_replacements(filename);
            packages_by_filename
                .entry(filename.clone())
                .or_default()
                .push(package_name.clone());
            package_name_map.insert(package_name.clone(), filename);
        }

        let duplicates: Vec<String> = packages_by_filename
            .iter()
            .filter(|(_, package_names)| package_names.len() > 1)
            .map(|(filename, package_names)| format!("{:?} --> {}", package_names, filename))
            .collect();
        if !duplicates.is_empty() {
            return Err(PackerError::configuration(format!(
                "Multiple packages in build config {} (sections {:?}) map to the same export name {}",
                self.name(),
                self.enabled_sections(),
                duplicates.join(", ")
            )));
        }
        Ok(package_name_map)
    }
}
