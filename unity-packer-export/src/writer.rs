//! Package writers
//!
//! [`PackageWriter`] is the step of a project export that turns one package
//! into an archive. [`ArchivePackageWriter`] stages the assets of the
//! package in a temporary directory and packs it; tests substitute their own
//! writer to observe what a project export asks for.

use crate::asset::{Asset, UPM_PACKAGE_DIRECTORY};
use crate::config::{PackageConfiguration, ProjectConfiguration};
use crate::guid_database::GuidDatabase;
use crate::metadata::{add_labels, default_metadata};
use crate::settings::ExportSettings;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;
use unity_packer_archive::{copy_and_set_rwx, copy_tree, create_archive, find_in_dirs};
use unity_packer_core::{PackerError, Result, UPM_DOCUMENTATION_DIRECTORY, UPM_DOCUMENTATION_FILENAME};

const GENERATED_ASSETS_DIRECTORY: &str = "generated_assets";
const STAGING_DIRECTORY: &str = "plugin";

/// Files of a UPM package copied from configured paths: the configuration
/// key and the name in the package
const UPM_PACKAGE_DOCUMENTS: [(&str, &str); 3] = [
    ("readme", "README.md"),
    ("changelog", "CHANGELOG.md"),
    ("license", "LICENSE.md"),
];

/// One package to write
#[derive(Debug, Clone, Copy)]
pub struct PackageExport<'a> {
    pub project: &'a ProjectConfiguration,
    pub package: &'a PackageConfiguration,
    /// Directories searched for the package's assets
    pub assets_dirs: &'a [PathBuf],
    pub output_dir: &'a Path,
    /// Filename of the archive in `output_dir`
    pub package_filename: &'a str,
    pub settings: &'a ExportSettings,
}

impl PackageExport<'_> {
    /// Path of the archive to write
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.package_filename)
    }
}

/// Writes one package of a project export
pub trait PackageWriter {
    /// Write a `.unitypackage`, returning its path
    fn write_unitypackage(&self, export: &PackageExport<'_>, guid_database: &mut GuidDatabase) -> Result<PathBuf>;

    /// Write a UPM tarball, returning its path
    fn write_upm(&self, export: &PackageExport<'_>, guid_database: &mut GuidDatabase) -> Result<PathBuf>;
}

/// Writes packages as archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchivePackageWriter;

impl PackageWriter for ArchivePackageWriter {
    fn write_unitypackage(&self, export: &PackageExport<'_>, guid_database: &mut GuidDatabase) -> Result<PathBuf> {
        write_unitypackage(export, guid_database)
    }

    fn write_upm(&self, export: &PackageExport<'_>, guid_database: &mut GuidDatabase) -> Result<PathBuf> {
        write_upm_package(export, guid_database)
    }
}

struct StagingArea {
    // Removed with every file below it when dropped
    _root: TempDir,
    generated_assets_dir: PathBuf,
    staging_dir: PathBuf,
}

impl StagingArea {
    fn new() -> Result<Self> {
        let root = TempDir::new()?;
        let generated_assets_dir = root.path().join(GENERATED_ASSETS_DIRECTORY);
        let staging_dir = root.path().join(STAGING_DIRECTORY);
        for dir in [&generated_assets_dir, &staging_dir] {
            fs::create_dir_all(dir).map_err(|e| PackerError::file_io(dir, e))?;
        }
        Ok(Self {
            _root: root,
            generated_assets_dir,
            staging_dir,
        })
    }
}

/// Write a package as a `.unitypackage`.
///
/// The package's assets, its manifest and the manifests of the packages it
/// includes are staged as `<guid>/asset`, `<guid>/asset.meta` and
/// `<guid>/pathname` and packed into a gzipped tarball.
pub fn write_unitypackage(export: &PackageExport<'_>, guid_database: &mut GuidDatabase) -> Result<PathBuf> {
    let PackageExport {
        project,
        package,
        assets_dirs,
        settings,
        ..
    } = *export;
    let unity_package_file = export.output_path();
    let staging = StagingArea::new()?;
    info!("Packaging {} to {}...", package.name(), unity_package_file.display());

    let mut assets = package.find_assets(project, assets_dirs, true, false)?;
    if let Some(manifest) = package.write_manifest(project, &staging.generated_assets_dir, &assets)? {
        assets.push(manifest);
    }
    for include in package.includes(project)? {
        let include_assets = include.find_assets(project, assets_dirs, true, false)?;
        if let Some(manifest) = include.write_manifest(project, &staging.generated_assets_dir, &include_assets)? {
            assets.push(manifest);
        }
    }

    guid_database.read_guids_from_assets(&assets)?;
    for asset in Asset::sorted_by_filename(assets) {
        let guid = guid_database.lookup(asset.filename_guid_lookup())?;
        if let Some(asset_dir) = asset.write(&staging.staging_dir, &guid, settings.timestamp)? {
            info!("- Processed {} --> {}", asset.filename(), asset_dir.display());
        }
    }

    create_archive(&unity_package_file, &staging.staging_dir, &settings.archive_options())?;
    info!("Created {} for {}", unity_package_file.display(), package.name());
    Ok(unity_package_file)
}

/// Write a package as a UPM tarball.
///
/// Adds `package.json`, the legacy manifest, the configured readme,
/// changelog and license files and a folder asset for every directory. The
/// configured documentation is copied to `Documentation~` without `.meta`
/// files.
pub fn write_upm_package(export: &PackageExport<'_>, guid_database: &mut GuidDatabase) -> Result<PathBuf> {
    let PackageExport {
        project,
        package,
        assets_dirs,
        settings,
        ..
    } = *export;
    let common_name = package.common_package_name().ok_or_else(|| {
        PackerError::configuration(format!(
            "Detected package {} has missing package name under common_manifest",
            package.name()
        ))
    })?;
    let unity_package_file = export.output_path();
    let staging = StagingArea::new()?;
    info!("Packaging {} to {}...", package.name(), unity_package_file.display());

    let mut assets = package.find_assets(project, assets_dirs, true, true)?;
    assets.push(package.write_upm_manifest(project, &staging.generated_assets_dir)?);
    if let Some(manifest) = package.write_manifest(project, &staging.generated_assets_dir, &assets)? {
        assets.push(manifest);
    }

    for (key, target) in UPM_PACKAGE_DOCUMENTS {
        let Some(source) = package.configured_file(key) else {
            continue;
        };
        let source_absolute = find_in_dirs(source, assets_dirs).ok_or_else(|| {
            PackerError::configuration(format!(
                "Cannot find '{}' at '{}' for package '{}'. Perhaps it is not included in assets_dir or assets_zip?",
                key,
                source,
                package.name()
            ))
        })?;
        let mut metadata = default_metadata();
        add_labels(&mut metadata, package.labels(project));
        assets.push(
            Asset::new(target, source_absolute, metadata).with_guid_lookup(format!("{}/{}", common_name, target)),
        );
    }

    let mut folders = BTreeSet::new();
    for asset in &assets {
        let mut path = asset.filename();
        while let Some((parent, _)) = path.rsplit_once('/') {
            if parent.is_empty() {
                break;
            }
            folders.insert(parent.to_string());
            path = parent;
        }
    }
    for folder in folders {
        let lookup = format!("{}/{}", common_name, folder);
        assets.push(Asset::folder(&folder, default_metadata()).with_guid_lookup(lookup));
    }

    guid_database.read_guids_from_assets(&assets)?;
    for asset in Asset::sorted_by_filename(assets) {
        let guid = guid_database.lookup(asset.filename_guid_lookup())?;
        let asset_dir = asset.write_upm(&staging.staging_dir, &guid, settings.timestamp)?;
        info!("- Processed {} --> {}", asset.filename(), asset_dir.display());
    }

    if let Some(documentation) = package.configured_file("documentation") {
        copy_documentation(package, documentation, assets_dirs, &staging.staging_dir)?;
    }

    create_archive(&unity_package_file, &staging.staging_dir, &settings.archive_options())?;
    info!("Created {} for {}", unity_package_file.display(), package.name());
    Ok(unity_package_file)
}

fn copy_documentation(
    package: &PackageConfiguration,
    documentation: &str,
    assets_dirs: &[PathBuf],
    staging_dir: &Path,
) -> Result<()> {
    let target_dir = staging_dir
        .join(UPM_PACKAGE_DIRECTORY)
        .join(UPM_DOCUMENTATION_DIRECTORY);
    match find_in_dirs(documentation, assets_dirs) {
        Some(source) if source.is_file() => {
            let target = target_dir.join(UPM_DOCUMENTATION_FILENAME);
            info!("- Copying doc file {} --> {}", source.display(), target.display());
            copy_and_set_rwx(&source, &target)
        }
        Some(source) if source.is_dir() => {
            if !source.join(UPM_DOCUMENTATION_FILENAME).exists() {
                return Err(PackerError::configuration(format!(
                    "Cannot find index.md under '{}' for package '{}'. Perhaps it is not included in assets_dir or assets_zip?",
                    source.display(),
                    package.name()
                )));
            }
            info!("- Copying doc folder {} --> {}", source.display(), target_dir.display());
            copy_tree(&source, &target_dir)?;
            Ok(())
        }
        _ => Err(PackerError::configuration(format!(
            "Cannot find documentation at '{}' for package '{}'. Perhaps the file/folder is not included in assets_dir or assets_zip?",
            documentation,
            package.name()
        ))),
    }
}
