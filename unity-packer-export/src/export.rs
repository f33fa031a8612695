//! Export pipeline
//!
//! Runs one export of a project document: stages the asset inputs, loads the
//! GUID store and the project, then writes `.unitypackage` files and UPM
//! tarballs to the output directory or an output zip.

use crate::config::ProjectConfiguration;
use crate::guid_database::GuidDatabase;
use crate::settings::ExportSettings;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use unity_packer_archive::{copy_files_to_dir, extract_zip_to_temp_dir, write_zipfile};
use unity_packer_core::{PackerError, Result};

/// Inputs and outputs of one export run
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Project document
    pub config_file: PathBuf,
    /// Directories searched for assets, in order
    pub assets_dirs: Vec<PathBuf>,
    /// Zip files extracted and searched after `assets_dirs`
    pub assets_zips: Vec<PathBuf>,
    /// `input[:output]` files staged as assets
    pub asset_files: Vec<String>,
    /// `input[:output]` files copied to the output after a `.unitypackage`
    /// export
    pub additional_files: Vec<String>,
    pub output_dir: PathBuf,
    /// Zip the outputs to this file instead of keeping `output_dir`
    pub output_zip: Option<PathBuf>,
    pub output_unitypackage: bool,
    pub output_upm: bool,
    pub enabled_sections: BTreeSet<String>,
    /// GUID store
    pub guids_file: Option<PathBuf>,
    pub settings: ExportSettings,
}

impl ExportRequest {
    /// Request a `.unitypackage` export of `config_file` with assets in the
    /// current directory
    pub fn new<P: Into<PathBuf>>(config_file: P) -> Self {
        Self {
            config_file: config_file.into(),
            assets_dirs: vec![PathBuf::from(".")],
            assets_zips: Vec::new(),
            asset_files: Vec::new(),
            additional_files: Vec::new(),
            output_dir: PathBuf::from("output"),
            output_zip: None,
            output_unitypackage: true,
            output_upm: false,
            enabled_sections: BTreeSet::new(),
            guids_file: None,
            settings: ExportSettings::default(),
        }
    }
}

/// Files produced by an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// `.unitypackage` files and the build that wrote each
    pub unitypackages: IndexMap<PathBuf, String>,
    /// UPM tarballs and the build that wrote each
    pub upm_packages: IndexMap<PathBuf, String>,
    /// Additional files copied to the output
    pub additional_files: Vec<String>,
    /// Zip holding every output, when requested. Paths above are then
    /// relative to the zip.
    pub output_zip: Option<PathBuf>,
}

/// Run an export.
///
/// Temporary directories for zipped assets, staged asset files and zipped
/// output are removed when the run finishes, whether it succeeds or not.
pub fn run_export(request: &ExportRequest) -> Result<ExportSummary> {
    let settings = &request.settings;
    if request.output_upm && !settings.enforce_semver {
        return Err(PackerError::configuration(
            "enforce_semver flag should be True when output_upm flag is set to True",
        ));
    }

    let zip_output_dir = match &request.output_zip {
        Some(_) => Some(TempDir::new()?),
        None => {
            prepare_output_dir(&request.output_dir)?;
            None
        }
    };
    let output_dir = zip_output_dir
        .as_ref()
        .map_or(request.output_dir.as_path(), TempDir::path);

    let mut temporary_assets_dirs = Vec::new();
    for assets_zip in &request.assets_zips {
        let extracted = extract_zip_to_temp_dir(assets_zip).map_err(|e| {
            PackerError::configuration(format!(
                "Failed to extract assets zip file {} ({})",
                assets_zip.display(),
                e
            ))
        })?;
        temporary_assets_dirs.push(extracted);
    }
    if !request.asset_files.is_empty() {
        let asset_files_dir = TempDir::new()?;
        copy_files_to_dir(&request.asset_files, asset_files_dir.path())
            .map_err(|e| PackerError::configuration(format!("Failed while copying input files ({})", e)))?;
        temporary_assets_dirs.push(asset_files_dir);
    }

    let mut guid_database = match &request.guids_file {
        Some(guids_file) => GuidDatabase::load(guids_file, settings.plugins_version.as_deref()).map_err(|e| {
            PackerError::configuration(format!(
                "Failed to load GUIDs JSON from {} ({})",
                guids_file.display(),
                e
            ))
        })?,
        None => GuidDatabase::new(),
    };
    guid_database.check_duplicates()?;
    debug!("Loaded {} GUIDs", guid_database.len());

    let mut project = ProjectConfiguration::load(
        &request.config_file,
        request.enabled_sections.clone(),
        settings.plugins_version.clone(),
        settings.enforce_semver,
    )
    .map_err(|e| {
        PackerError::configuration(format!(
            "Error while parsing project configuration from {} ({})",
            request.config_file.display(),
            e
        ))
    })?;

    let mut assets_dirs = request.assets_dirs.clone();
    assets_dirs.extend(temporary_assets_dirs.iter().map(|dir| dir.path().to_path_buf()));

    let mut summary = ExportSummary::default();
    if request.output_unitypackage {
        summary.unitypackages = project.write(&mut guid_database, &assets_dirs, output_dir, settings, false)?;
        summary.additional_files = copy_files_to_dir(&request.additional_files, output_dir).map_err(|e| {
            PackerError::configuration(format!("Failed while copying additional output files ({})", e))
        })?;
    }
    if request.output_upm {
        summary.upm_packages = project.write(&mut guid_database, &assets_dirs, output_dir, settings, true)?;
    }

    if let Some(output_zip) = &request.output_zip {
        write_zipfile(output_zip, output_dir).map_err(|e| {
            PackerError::configuration(format!(
                "Failed when writing output zip file {} ({})",
                output_zip.display(),
                e
            ))
        })?;
        info!("Wrote {}", output_zip.display());
        summary.relativize(output_dir);
        summary.output_zip = Some(output_zip.clone());
    }
    Ok(summary)
}

fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir).map_err(|e| PackerError::file_io(output_dir, e))?;
    } else if !output_dir.is_dir() {
        return Err(PackerError::configuration(format!(
            "output_dir {} is not a directory",
            output_dir.display()
        )));
    }
    Ok(())
}

impl ExportSummary {
    fn relativize(&mut self, output_dir: &Path) {
        let strip = |path: PathBuf| path.strip_prefix(output_dir).map(Path::to_path_buf).unwrap_or(path);
        self.unitypackages = std::mem::take(&mut self.unitypackages)
            .into_iter()
            .map(|(path, build)| (strip(path), build))
            .collect();
        self.upm_packages = std::mem::take(&mut self.upm_packages)
            .into_iter()
            .map(|(path, build)| (strip(path), build))
            .collect();
        let output_prefix = format!("{}/", unity_packer_core::posix_path(output_dir.to_string_lossy()));
        for file in &mut self.additional_files {
            if let Some(relative) = file.strip_prefix(&output_prefix) {
                *file = relative.to_string();
            }
        }
    }
}
