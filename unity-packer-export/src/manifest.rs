//! Package manifests
//!
//! A legacy manifest is a text file listing every file of a package, which
//! the version handler uses to remove files of older versions. UPM packages
//! are described by `package.json`.

use crate::asset::Asset;
use crate::config::{PackageConfiguration, ProjectConfiguration};
use crate::labels::{manifest_label, manifest_name_label, upm_manifest_label, version_handler_filename};
use crate::metadata::{add_labels, default_metadata};
use std::fs;
use std::path::Path;
use tracing::debug;
use unity_packer_core::tree_access::{get_array, get_object, set_value};
use unity_packer_core::{
    ASSETS_DIRECTORY, PackerError, Result, UPM_KEYWORDS_MANIFEST_PREFIX, UPM_MANIFEST_FILENAME, UnityValue,
    VERSION_HANDLER_MANIFEST_FIELD_PREFIX, VERSION_HANDLER_VERSION_FIELD_PREFIX, posix_path,
};
use unity_packer_yaml::dump_json_pretty;

/// Kind of manifest generated for a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Version handler `.txt` manifest
    Legacy,
    /// UPM `package.json`
    Upm,
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PackerError::file_io(parent, e))?;
    }
    Ok(())
}

impl PackageConfiguration {
    /// Path of the legacy manifest in the package, when the package has a
    /// manifest path and the project a version
    pub fn manifest_filename(&self, project: &ProjectConfiguration) -> Option<String> {
        let path = self.manifest_path()?;
        let version = project.version()?;
        let filename = format!("{}/{}.txt", posix_path(path).trim_end_matches('/'), self.package_name());
        Some(version_handler_filename(
            &filename,
            &[
                (VERSION_HANDLER_VERSION_FIELD_PREFIX, Some(version)),
                (VERSION_HANDLER_MANIFEST_FIELD_PREFIX, None),
            ],
        ))
    }

    /// Metadata of a generated manifest, `None` when the manifest is not
    /// generated
    pub fn manifest_metadata(&self, project: &ProjectConfiguration, kind: ManifestKind) -> Option<UnityValue> {
        project.version()?;
        if kind == ManifestKind::Legacy && self.manifest_filename(project).is_none() {
            return None;
        }
        let mut labels = self.labels(project);
        match kind {
            ManifestKind::Legacy => {
                labels.insert(manifest_label());
                let display_name = self.common_package_display_name();
                let mut priority = 0;
                if !display_name.is_empty() {
                    labels.insert(manifest_name_label(priority, display_name));
                    priority += 1;
                }
                if self.package_name() != display_name {
                    labels.insert(manifest_name_label(priority, self.package_name()));
                }
            }
            ManifestKind::Upm => {
                labels.insert(upm_manifest_label());
            }
        }
        let mut metadata = default_metadata();
        add_labels(&mut metadata, labels);
        Some(metadata)
    }

    /// Write the legacy manifest listing `assets` below `output_dir`.
    ///
    /// An asset already exported at the manifest path is returned instead of
    /// a generated one.
    pub fn write_manifest(
        &self,
        project: &ProjectConfiguration,
        output_dir: &Path,
        assets: &[Asset],
    ) -> Result<Option<Asset>> {
        let Some(manifest_filename) = self.manifest_filename(project) else {
            return Ok(None);
        };
        let manifest_absolute_path = output_dir.join(&manifest_filename);
        create_parent_dir(&manifest_absolute_path)?;

        let mut filenames: Vec<&str> = assets.iter().map(Asset::filename).collect();
        filenames.sort_unstable();
        let mut content = filenames
            .iter()
            .map(|filename| format!("{}/{}", ASSETS_DIRECTORY, filename))
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');
        fs::write(&manifest_absolute_path, content).map_err(|e| PackerError::file_io(&manifest_absolute_path, e))?;
        debug!("Wrote manifest {} for {}", manifest_filename, self.name());

        if let Some(existing) = assets.iter().find(|asset| asset.filename() == manifest_filename) {
            return Ok(Some(existing.clone()));
        }
        let metadata = self
            .manifest_metadata(project, ManifestKind::Legacy)
            .unwrap_or_else(default_metadata);
        Ok(Some(Asset::new(&manifest_filename, manifest_absolute_path, metadata)))
    }

    /// Write `package.json` below `output_dir`.
    ///
    /// Direct includes exported as UPM packages become dependencies pinned
    /// to the project version.
    pub fn write_upm_manifest(&self, project: &ProjectConfiguration, output_dir: &Path) -> Result<Asset> {
        let name = self.common_package_name().ok_or_else(|| {
            PackerError::configuration(format!(
                "Detected package {} has missing package name under common_manifest",
                self.name()
            ))
        })?;

        let mut manifest = UnityValue::object();
        manifest.insert("name", name);
        manifest.insert("version", project.version());
        if let Some(common_manifest) = self.common_manifest() {
            for (common_key, upm_key) in [
                ("display_name", "displayName"),
                ("keywords", "keywords"),
                ("author", "author"),
            ] {
                let value = common_manifest.get(common_key).filter(|value| !value.is_null()).cloned();
                set_value(&mut manifest, upm_key, value);
            }
        }
        set_value(
            &mut manifest,
            "description",
            self.common_package_description().map(UnityValue::from),
        );

        if self.export() && self.manifest_path().is_some() {
            let mut keywords = get_array(&manifest, "keywords").cloned().unwrap_or_default();
            keywords.push(format!("{}{}", UPM_KEYWORDS_MANIFEST_PREFIX, self.package_name()).into());
            let display_name = self.common_package_display_name();
            if display_name != self.package_name() {
                keywords.push(format!("{}{}", UPM_KEYWORDS_MANIFEST_PREFIX, display_name).into());
            }
            manifest.insert("keywords", keywords);
        }

        let mut dependencies = UnityValue::object();
        if let Some(upm_manifest) = self.upm_manifest() {
            let unity = upm_manifest.get("unity").filter(|value| !value.is_null()).cloned();
            set_value(&mut manifest, "unity", unity);
            if let Some(configured) = get_object(upm_manifest, "dependencies") {
                dependencies = UnityValue::Object(configured.clone());
            }
        }
        let mut missing = Vec::new();
        for include in self.direct_includes(project)? {
            if !include.export_upm() {
                continue;
            }
            match include.common_package_name() {
                Some(dependency) => {
                    dependencies.insert(dependency, project.version());
                }
                None => missing.push(include.name().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(PackerError::configuration(format!(
                "Detected multiple dependencies by {} has missing package name\n{}",
                self.name(),
                missing.join("\n")
            )));
        }
        manifest.insert("dependencies", dependencies);

        let manifest_absolute_path = output_dir.join(UPM_MANIFEST_FILENAME);
        create_parent_dir(&manifest_absolute_path)?;
        fs::write(&manifest_absolute_path, dump_json_pretty(&manifest)?)
            .map_err(|e| PackerError::file_io(&manifest_absolute_path, e))?;

        let metadata = self
            .manifest_metadata(project, ManifestKind::Upm)
            .unwrap_or_else(default_metadata);
        Ok(Asset::new(UPM_MANIFEST_FILENAME, manifest_absolute_path, metadata)
            .with_guid_lookup(format!("{}/{}", name, UPM_MANIFEST_FILENAME)))
    }
}
