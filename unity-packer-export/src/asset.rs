//! Exportable assets
//!
//! An [`Asset`] pairs a file (or folder) with the importer metadata it is
//! exported with. The stored metadata is never modified: the metadata written
//! to disk is derived from it on every read by [`Asset::importer_metadata`].

use crate::labels::{export_path_label, linux_library_label};
use crate::metadata::{
    add_labels, apply_any_platform_selection, default_metadata, disable_unsupported_platforms, folder_metadata,
    merge_override, set_cpu_for_desktop_platforms,
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use unity_packer_archive::copy_and_set_rwx;
use unity_packer_core::tree_access::get_i64;
use unity_packer_core::{ASSET_METADATA_FILE_EXTENSION, ASSETS_DIRECTORY, PackerError, Result, UnityValue, posix_path};
use unity_packer_yaml::MetaSerializer;

/// Directory of a UPM tarball that holds the package content
pub const UPM_PACKAGE_DIRECTORY: &str = "package";

/// A file or folder to export
#[derive(Clone)]
pub struct Asset {
    filename: String,
    filename_absolute: PathBuf,
    importer_metadata: UnityValue,
    filename_guid_lookup: String,
    is_folder: bool,
}

impl Asset {
    /// Create a file asset exported to `filename` (relative to `Assets`)
    pub fn new<F: AsRef<str>, A: Into<PathBuf>>(filename: F, filename_absolute: A, importer_metadata: UnityValue) -> Self {
        let filename = posix_path(filename);
        Self {
            filename_guid_lookup: filename.clone(),
            filename,
            filename_absolute: filename_absolute.into(),
            importer_metadata,
            is_folder: false,
        }
    }

    /// Create a folder asset
    pub fn folder<F: AsRef<str>>(filename: F, importer_metadata: UnityValue) -> Self {
        let filename = posix_path(filename);
        let mut asset = Self::new(&filename, PathBuf::from(&filename), importer_metadata);
        asset.is_folder = true;
        asset
    }

    /// Resolve the GUID of this asset with `lookup` instead of its filename
    pub fn with_guid_lookup<S: AsRef<str>>(mut self, lookup: S) -> Self {
        self.filename_guid_lookup = posix_path(lookup);
        self
    }

    /// Export path relative to the `Assets` directory
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn filename_absolute(&self) -> &Path {
        &self.filename_absolute
    }

    /// Key used to resolve this asset's GUID
    pub fn filename_guid_lookup(&self) -> &str {
        &self.filename_guid_lookup
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    /// Metadata as it was stored
    pub fn importer_metadata_original(&self) -> &UnityValue {
        &self.importer_metadata
    }

    /// Metadata written for this asset.
    ///
    /// Adds the export path labels, then disables platforms unsupported by
    /// native libraries, propagates the Any platform and fills in desktop
    /// CPUs. Always computed from the stored metadata.
    pub fn importer_metadata(&self) -> UnityValue {
        let mut labels = Vec::with_capacity(2);
        labels.extend(linux_library_label(&self.filename));
        labels.push(export_path_label(&self.filename));

        let mut metadata = self.importer_metadata.clone();
        add_labels(&mut metadata, labels);
        disable_unsupported_platforms(&mut metadata, &self.filename);
        apply_any_platform_selection(&mut metadata);
        set_cpu_for_desktop_platforms(&mut metadata);
        metadata
    }

    /// Stage this asset for a `.unitypackage`.
    ///
    /// Writes `<guid>/asset`, `<guid>/asset.meta` and `<guid>/pathname` below
    /// `output_dir`. Folders are not staged.
    pub fn write<P: AsRef<Path>>(&self, output_dir: P, guid: &str, timestamp: i64) -> Result<Option<PathBuf>> {
        if self.is_folder {
            return Ok(None);
        }
        let asset_dir = output_dir.as_ref().join(guid);
        fs::create_dir_all(&asset_dir).map_err(|e| PackerError::file_io(&asset_dir, e))?;

        let asset_path = asset_dir.join("asset");
        copy_and_set_rwx(&self.filename_absolute, &asset_path)?;
        self.create_metadata(metadata_path(&asset_path), guid, timestamp)?;

        let pathname = asset_dir.join("pathname");
        fs::write(&pathname, format!("{}/{}", ASSETS_DIRECTORY, self.filename))
            .map_err(|e| PackerError::file_io(&pathname, e))?;
        Ok(Some(asset_dir))
    }

    /// Stage this asset for a UPM tarball as `package/<filename>` and its
    /// `.meta` file
    pub fn write_upm<P: AsRef<Path>>(&self, output_dir: P, guid: &str, timestamp: i64) -> Result<PathBuf> {
        let output = output_dir.as_ref().join(UPM_PACKAGE_DIRECTORY).join(&self.filename);
        if self.is_folder {
            fs::create_dir_all(&output).map_err(|e| PackerError::file_io(&output, e))?;
        } else {
            copy_and_set_rwx(&self.filename_absolute, &output)?;
        }
        self.create_metadata(metadata_path(&output), guid, timestamp)?;
        Ok(output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| output.clone()))
    }

    /// Write the `.meta` document of this asset.
    ///
    /// An existing `timeCreated` is kept. Otherwise `timestamp` is used, where
    /// a negative value means the file's creation time (0 for folders).
    pub fn create_metadata<P: AsRef<Path>>(&self, path: P, guid: &str, timestamp: i64) -> Result<()> {
        let importer_metadata = if self.is_folder {
            folder_metadata()
        } else {
            self.importer_metadata()
        };
        let timestamp = if timestamp >= 0 {
            timestamp
        } else if self.is_folder {
            0
        } else {
            creation_time(&self.filename_absolute)?
        };
        let time_created = get_i64(&importer_metadata, "timeCreated").unwrap_or(timestamp);
        let identity = UnityValue::from_pairs([
            ("guid", UnityValue::from(guid)),
            ("timeCreated", UnityValue::from(time_created)),
        ]);
        write_metadata(path, &[&default_metadata(), &importer_metadata, &identity])
    }

    /// Sort assets by export path
    pub fn sorted_by_filename<I: IntoIterator<Item = Asset>>(assets: I) -> Vec<Asset> {
        let mut assets: Vec<Asset> = assets.into_iter().collect();
        assets.sort_by(|a, b| a.filename.cmp(&b.filename));
        assets
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename
            && self.filename_guid_lookup == other.filename_guid_lookup
            && self.filename_absolute == other.filename_absolute
            && self.is_folder == other.is_folder
            && self.importer_metadata() == other.importer_metadata()
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Asset filename={} metadata={}>", self.filename, self.importer_metadata())
    }
}

pub(crate) fn metadata_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(ASSET_METADATA_FILE_EXTENSION);
    PathBuf::from(name)
}

/// Merge metadata layers in order and write them as a `.meta` document.
/// An empty `labels` entry is dropped.
pub fn write_metadata<P: AsRef<Path>>(path: P, layers: &[&UnityValue]) -> Result<()> {
    let path = path.as_ref();
    let mut output = UnityValue::object();
    for layer in layers {
        merge_override(&mut output, layer);
    }
    if output.get("labels").is_some_and(|labels| !labels.is_truthy()) {
        output.remove("labels");
    }
    debug!("Writing metadata {}", path.display());
    MetaSerializer::new().write_file(path, &output)
}

#[cfg(unix)]
fn creation_time(path: &Path) -> Result<i64> {
    use std::os::unix::fs::MetadataExt;
    let metadata = fs::metadata(path).map_err(|e| PackerError::file_io(path, e))?;
    Ok(metadata.ctime())
}

#[cfg(not(unix))]
fn creation_time(path: &Path) -> Result<i64> {
    use std::time::UNIX_EPOCH;
    let metadata = fs::metadata(path).map_err(|e| PackerError::file_io(path, e))?;
    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(|e| PackerError::file_io(path, e))?;
    Ok(created
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default())
}
