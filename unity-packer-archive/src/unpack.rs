//! `.unitypackage` unpacking
//!
//! A `.unitypackage` is a gzip compressed tar file holding one directory per
//! asset GUID with `asset`, `asset.meta` and `pathname` members. Unpacking
//! writes each asset to the path named by its `pathname` member without
//! going through the Unity Editor.

use crate::staging::copy_tree;
use flate2::read::GzDecoder;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use unity_packer_core::{PackerError, Result, posix_path};

const PATHNAME_MEMBER: &str = "pathname";
const ASSET_MEMBER: &str = "asset";
const ASSET_META_MEMBER: &str = "asset.meta";

/// Regular files of a package that were not extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredMembers {
    pub package: PathBuf,
    pub members: Vec<String>,
}

type PackageArchive = tar::Archive<GzDecoder<BufReader<File>>>;

fn open_package(package: &Path) -> Result<PackageArchive> {
    let file = File::open(package).map_err(|e| PackerError::file_io(package, e))?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(file))))
}

fn member_name<R: Read>(entry: &tar::Entry<'_, R>) -> Result<String> {
    Ok(posix_path(entry.path()?.to_string_lossy()))
}

/// Split a member name into its GUID directory and basename
fn split_member(name: &str) -> (&str, &str) {
    name.rsplit_once('/').unwrap_or(("", name))
}

fn is_safe_relative(pathname: &str) -> bool {
    Path::new(pathname)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Unpack packages, in order, into `directory`.
///
/// Returns, for each package that had any, the regular files that could not
/// be mapped to an asset path.
pub fn unpack_to_directory<D, P>(directory: D, packages: &[P]) -> Result<Vec<IgnoredMembers>>
where
    D: AsRef<Path>,
    P: AsRef<Path>,
{
    let directory = directory.as_ref();
    let mut ignored_by_package = Vec::new();
    for package in packages {
        let package = package.as_ref();
        let ignored = unpack_package(directory, package)?;
        if !ignored.is_empty() {
            ignored_by_package.push(IgnoredMembers {
                package: package.to_path_buf(),
                members: ignored,
            });
        }
    }
    Ok(ignored_by_package)
}

fn unpack_package(directory: &Path, package: &Path) -> Result<Vec<String>> {
    debug!("Unpacking {}", package.display());
    let mut members: Vec<(String, bool)> = Vec::new();
    let mut path_by_guid: HashMap<String, String> = HashMap::new();
    let mut extracted: HashSet<String> = HashSet::new();

    // Map each asset GUID to the path it is extracted to.
    let mut archive = open_package(package)?;
    for entry in archive.entries().map_err(|e| PackerError::file_io(package, e))? {
        let mut entry = entry.map_err(|e| PackerError::file_io(package, e))?;
        let name = member_name(&entry)?;
        members.push((name.clone(), entry.header().entry_type().is_file()));

        let (guid, basename) = split_member(&name);
        if basename != PATHNAME_MEMBER {
            continue;
        }
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| PackerError::file_io(package, e))?;
        let pathname = content.trim();
        if !guid.is_empty() && !pathname.is_empty() {
            path_by_guid.insert(guid.to_string(), pathname.to_string());
            extracted.insert(name.clone());
        }
    }

    // Extract each asset and its metadata.
    let mut archive = open_package(package)?;
    for entry in archive.entries().map_err(|e| PackerError::file_io(package, e))? {
        let mut entry = entry.map_err(|e| PackerError::file_io(package, e))?;
        let name = member_name(&entry)?;
        let (guid, basename) = split_member(&name);
        let extension = match basename {
            ASSET_MEMBER => "",
            ASSET_META_MEMBER => ".meta",
            _ => continue,
        };
        let Some(pathname) = path_by_guid.get(guid) else {
            continue;
        };
        if !is_safe_relative(pathname) {
            warn!("Skipping {} from {}, unsafe path {}", name, package.display(), pathname);
            continue;
        }
        let output = directory.join(format!("{}{}", pathname, extension));
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| PackerError::file_io(parent, e))?;
        }
        let mut output_file = File::create(&output).map_err(|e| PackerError::file_io(&output, e))?;
        io::copy(&mut entry, &mut output_file).map_err(|e| PackerError::file_io(&output, e))?;
        extracted.insert(name);
    }

    Ok(members
        .into_iter()
        .filter(|(name, is_file)| *is_file && !extracted.contains(name))
        .map(|(name, _)| name)
        .collect())
}

/// Paths from `paths` that are not existing files
pub fn missing_files<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| p.as_ref().to_path_buf())
        .filter(|p| !p.is_file())
        .collect()
}

/// Paths from `paths` that are not existing directories
pub fn missing_directories<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| p.as_ref().to_path_buf())
        .filter(|p| !p.is_dir())
        .collect()
}

/// Unpack every package into a scratch directory, then copy the result into
/// each project directory
pub fn import_packages<P, Q>(packages: &[P], projects: &[Q]) -> Result<Vec<IgnoredMembers>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let unpack_dir = tempfile::tempdir()?;
    let ignored = unpack_to_directory(unpack_dir.path(), packages)?;
    for project in projects {
        let copied = copy_tree(unpack_dir.path(), project)?;
        info!("Copied {} files into {}", copied, project.as_ref().display());
    }
    Ok(ignored)
}
