//! Project configuration
//!
//! The project holds every package and build of a project document and the
//! set of sections currently selected. Selecting sections recomputes the
//! enabled packages and builds; an invalid selection leaves the project
//! unchanged.

use crate::config::{BuildConfiguration, ConfigurationBlock, PackageConfiguration};
use crate::guid_database::GuidDatabase;
use crate::settings::ExportSettings;
use crate::writer::{ArchivePackageWriter, PackageExport, PackageWriter};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use unity_packer_core::tree_access::get_array;
use unity_packer_core::{PackerError, Result, UnityValue, is_valid_release_version};
use unity_packer_yaml::load_json_file;

static NO_SECTIONS: BTreeSet<String> = BTreeSet::new();

struct BuildPlan {
    build: BuildConfiguration,
    sections: BTreeSet<String>,
    package_name_map: IndexMap<String, String>,
}

/// Packages and builds of a project document
#[derive(Debug, Clone)]
pub struct ProjectConfiguration {
    packages: Vec<PackageConfiguration>,
    all_builds: Vec<BuildConfiguration>,
    builds: Vec<usize>,
    packages_by_name: IndexMap<String, usize>,
    selected_sections: Option<BTreeSet<String>>,
    version: Option<String>,
}

impl ProjectConfiguration {
    /// Parse a project document and select `selected_sections`.
    ///
    /// With `enforce_semver` the version is required and must be
    /// `major.minor.patch(-preview)`.
    pub fn new(
        json: UnityValue,
        selected_sections: BTreeSet<String>,
        version: Option<String>,
        enforce_semver: bool,
    ) -> Result<Self> {
        let packages = get_array(&json, "packages")
            .into_iter()
            .flatten()
            .cloned()
            .map(PackageConfiguration::from_json)
            .collect::<Result<Vec<_>>>()?;

        if enforce_semver {
            match &version {
                None => {
                    return Err(PackerError::configuration(
                        "Version number is required to export to Unity Package Manager packages.",
                    ));
                }
                Some(version) if !is_valid_release_version(version) => {
                    return Err(PackerError::configuration(format!(
                        "Invalid version '{}'.  Should be 'major.minor.patch(-preview)' in numbers",
                        version
                    )));
                }
                Some(_) => {}
            }
        }

        let all_builds = match get_array(&json, "builds") {
            Some(builds) => builds
                .iter()
                .cloned()
                .map(BuildConfiguration::from_json)
                .collect::<Result<Vec<_>>>()?,
            None => vec![BuildConfiguration::from_json(UnityValue::object())?],
        };

        let mut project = Self {
            packages,
            all_builds,
            builds: Vec::new(),
            packages_by_name: IndexMap::new(),
            selected_sections: None,
            version,
        };
        project.set_selected_sections(selected_sections)?;
        Ok(project)
    }

    /// Load a project document from a JSON file
    pub fn load<P: AsRef<Path>>(
        path: P,
        selected_sections: BTreeSet<String>,
        version: Option<String>,
        enforce_semver: bool,
    ) -> Result<Self> {
        let json = load_json_file(path)?;
        Self::new(json, selected_sections, version, enforce_semver)
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Sections currently selected
    pub fn selected_sections(&self) -> &BTreeSet<String> {
        self.selected_sections.as_ref().unwrap_or(&NO_SECTIONS)
    }

    /// Enabled package called `name`
    pub fn package(&self, name: &str) -> Option<&PackageConfiguration> {
        self.packages_by_name.get(name).map(|&index| &self.packages[index])
    }

    /// Enabled packages in document order
    pub fn packages(&self) -> impl Iterator<Item = &PackageConfiguration> {
        self.packages_by_name.values().map(|&index| &self.packages[index])
    }

    /// Names of the enabled packages in document order
    pub fn package_names(&self) -> Vec<&str> {
        self.packages_by_name.keys().map(String::as_str).collect()
    }

    /// Enabled builds
    pub fn builds(&self) -> impl Iterator<Item = &BuildConfiguration> {
        self.builds.iter().map(|&index| &self.all_builds[index])
    }

    /// Select the sections used to enable packages and builds.
    ///
    /// Fails when two enabled packages share a name or the includes of the
    /// enabled packages are circular or missing. On failure the previous
    /// selection stays in place.
    pub fn set_selected_sections(&mut self, sections: BTreeSet<String>) -> Result<()> {
        if self.selected_sections.as_ref() == Some(&sections) {
            return Ok(());
        }

        let mut indices_by_name: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, package) in self.packages.iter().enumerate() {
            if package.is_enabled(&sections) {
                indices_by_name
                    .entry(package.name().to_string())
                    .or_default()
                    .push(index);
            } else {
                debug!(
                    "Package {} not enabled for sections {:?} (supports {:?})",
                    package.name(),
                    sections,
                    package.sections()
                );
            }
        }

        let mut duplicates: Vec<&str> = indices_by_name
            .iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(name, _)| name.as_str())
            .collect();
        if !duplicates.is_empty() {
            duplicates.sort_unstable();
            return Err(PackerError::configuration(format!(
                "Package(s) {:?} configured to export to the same path with enabled sections {:?}",
                duplicates, sections
            )));
        }

        let packages_by_name: IndexMap<String, usize> = indices_by_name
            .into_iter()
            .map(|(name, indices)| (name, indices[0]))
            .collect();
        let previous_sections = self.selected_sections.replace(sections);
        let previous_packages = std::mem::replace(&mut self.packages_by_name, packages_by_name);
        if let Err(err) = self.check_circular_references() {
            self.selected_sections = previous_sections;
            self.packages_by_name = previous_packages;
            return Err(err);
        }

        let selected = self.selected_sections().clone();
        self.builds = self
            .all_builds
            .iter()
            .enumerate()
            .filter(|(_, build)| {
                let enabled = build.is_enabled(&selected);
                if !enabled {
                    debug!(
                        "Build {} not enabled for sections {:?} (supports {:?})",
                        build.name(),
                        selected,
                        build.sections()
                    );
                }
                enabled
            })
            .map(|(index, _)| index)
            .collect();
        Ok(())
    }

    fn check_circular_references(&self) -> Result<()> {
        for package in self.packages() {
            package.check_circular_references(self, &mut Vec::new())?;
        }
        Ok(())
    }

    /// Export every enabled package with every enabled build.
    ///
    /// Returns the build name of each exported file.
    pub fn write(
        &mut self,
        guid_database: &mut GuidDatabase,
        assets_dirs: &[PathBuf],
        output_dir: &Path,
        settings: &ExportSettings,
        for_upm: bool,
    ) -> Result<IndexMap<PathBuf, String>> {
        self.write_with(&ArchivePackageWriter, guid_database, assets_dirs, output_dir, settings, for_upm)
    }

    /// Export every enabled package with `writer`.
    ///
    /// Fails before writing anything when two builds export the same file.
    /// Missing GUIDs are collected across packages and reported together.
    /// The selected sections are restored afterwards.
    pub fn write_with<W: PackageWriter + ?Sized>(
        &mut self,
        writer: &W,
        guid_database: &mut GuidDatabase,
        assets_dirs: &[PathBuf],
        output_dir: &Path,
        settings: &ExportSettings,
        for_upm: bool,
    ) -> Result<IndexMap<PathBuf, String>> {
        let selected_sections = self.selected_sections().clone();
        let result = self.write_builds(
            writer,
            guid_database,
            assets_dirs,
            output_dir,
            settings,
            for_upm,
            &selected_sections,
        );
        let restored = self.set_selected_sections(selected_sections);
        let exported = result?;
        restored?;
        Ok(exported)
    }

    fn plan_builds(&mut self, selected_sections: &BTreeSet<String>, for_upm: bool) -> Result<Vec<BuildPlan>> {
        let builds: Vec<BuildConfiguration> = self.builds().cloned().collect();
        let mut plans = Vec::with_capacity(builds.len());
        let mut build_indices_by_filename: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, build) in builds.iter().enumerate() {
            let mut sections = selected_sections.clone();
            sections.extend(build.enabled_sections());
            self.set_selected_sections(sections.clone())?;

            let mut filenames_by_package = IndexMap::new();
            for package in self.packages() {
                if for_upm {
                    if !package.export_upm() {
                        continue;
                    }
                    let tarball_name = package.tarball_name(self.version()).ok_or_else(|| {
                        PackerError::configuration(format!(
                            "Detected package {} has missing package name under common_manifest",
                            package.name()
                        ))
                    })?;
                    filenames_by_package.insert(package.name().to_string(), tarball_name);
                } else if package.export() {
                    filenames_by_package.insert(package.name().to_string(), package.name().to_string());
                }
            }
            let package_name_map = build.create_package_name_map(&filenames_by_package)?;
            for filename in package_name_map.values() {
                build_indices_by_filename
                    .entry(filename.clone())
                    .or_default()
                    .push(index);
            }
            plans.push(BuildPlan {
                build: build.clone(),
                sections,
                package_name_map,
            });
        }

        let duplicates: Vec<String> = build_indices_by_filename
            .iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(filename, indices)| {
                let names: Vec<&str> = indices.iter().map(|&index| builds[index].name()).collect();
                format!("{} exported by multiple builds {:?}", filename, names)
            })
            .collect();
        if !duplicates.is_empty() {
            return Err(PackerError::configuration(format!(
                "Detected multiple builds exporting packages to the same file(s).\n{}",
                duplicates.join("\n")
            )));
        }
        Ok(plans)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_builds<W: PackageWriter + ?Sized>(
        &mut self,
        writer: &W,
        guid_database: &mut GuidDatabase,
        assets_dirs: &[PathBuf],
        output_dir: &Path,
        settings: &ExportSettings,
        for_upm: bool,
        selected_sections: &BTreeSet<String>,
    ) -> Result<IndexMap<PathBuf, String>> {
        let plans = self.plan_builds(selected_sections, for_upm)?;

        let mut exported = IndexMap::new();
        let mut missing_guid_paths = Vec::new();
        for plan in plans {
            info!("Building {} using sections {:?}", plan.build.name(), plan.sections);
            self.set_selected_sections(plan.sections)?;
            for (package_name, package_filename) in &plan.package_name_map {
                let Some(package) = self.package(package_name) else {
                    continue;
                };
                let export = PackageExport {
                    project: self,
                    package,
                    assets_dirs,
                    output_dir,
                    package_filename,
                    settings,
                };
                let result = if for_upm {
                    writer.write_upm(&export, guid_database)
                } else {
                    writer.write_unitypackage(&export, guid_database)
                };
                match result {
                    Ok(path) => {
                        exported.insert(path, plan.build.name().to_string());
                    }
                    Err(PackerError::MissingGuids { paths }) => {
                        error!("Missing GUIDs while writing {} ({:?})", package.name(), paths);
                        missing_guid_paths.extend(paths);
                    }
                    Err(err @ PackerError::DuplicateGuids { .. }) => {
                        return Err(PackerError::configuration(format!(
                            "Duplicate GUIDs detected while writing package {} to {} ({})",
                            package.name(),
                            package_filename,
                            err
                        )));
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        if !missing_guid_paths.is_empty() {
            return Err(PackerError::missing_guids(missing_guid_paths));
        }
        Ok(exported)
    }
}
