//! Zip helpers for asset inputs and export outputs

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;
use unity_packer_core::{PackerError, Result, posix_path};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Extract a zip file into a new temporary directory.
///
/// The directory is removed when the returned handle is dropped.
pub fn extract_zip_to_temp_dir<P: AsRef<Path>>(zip_path: P) -> Result<TempDir> {
    let zip_path = zip_path.as_ref();
    let temp_dir = tempfile::tempdir()?;
    debug!("Unpacking zip file {} to {}...", zip_path.display(), temp_dir.path().display());
    extract_zip(zip_path, temp_dir.path())?;
    Ok(temp_dir)
}

/// Extract a zip file into `dest_dir`
pub fn extract_zip<P: AsRef<Path>, D: AsRef<Path>>(zip_path: P, dest_dir: D) -> Result<()> {
    let zip_path = zip_path.as_ref();
    let dest_dir = dest_dir.as_ref();
    let file = File::open(zip_path).map_err(|e| PackerError::file_io(zip_path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| PackerError::archive(format!("Failed to read {}: {}", zip_path.display(), e)))?;

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| PackerError::archive(format!("Failed to read {}: {}", zip_path.display(), e)))?;
        let Some(relative_path) = member.enclosed_name() else {
            continue;
        };
        let output = dest_dir.join(relative_path);
        if member.is_dir() {
            fs::create_dir_all(&output).map_err(|e| PackerError::file_io(&output, e))?;
            continue;
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| PackerError::file_io(parent, e))?;
        }
        let mut output_file = File::create(&output).map_err(|e| PackerError::file_io(&output, e))?;
        io::copy(&mut member, &mut output_file).map_err(|e| PackerError::file_io(&output, e))?;
    }
    Ok(())
}

/// Write every file below `source_dir` into a new zip file, replacing any
/// existing file
pub fn write_zipfile<P: AsRef<Path>, S: AsRef<Path>>(zip_path: P, source_dir: S) -> Result<()> {
    let zip_path = zip_path.as_ref();
    let source_dir = source_dir.as_ref();
    if zip_path.exists() {
        fs::remove_file(zip_path).map_err(|e| PackerError::file_io(zip_path, e))?;
    }
    debug!("Archiving directory {} to {}...", source_dir.display(), zip_path.display());

    let file = File::create(zip_path).map_err(|e| PackerError::file_io(zip_path, e))?;
    let mut archive = ZipWriter::new(file);
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PackerError::archive(format!("Failed to walk {}: {}", source_dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| PackerError::archive(e.to_string()))?;
        let name = posix_path(relative.to_string_lossy());

        let content = fs::read(entry.path()).map_err(|e| PackerError::file_io(entry.path(), e))?;
        let options = SimpleFileOptions::default().large_file(content.len() as u64 >= u32::MAX as u64);
        archive
            .start_file(name.as_str(), options)
            .map_err(|e| PackerError::archive(format!("Failed to add {} to {}: {}", name, zip_path.display(), e)))?;
        archive.write_all(&content).map_err(|e| PackerError::file_io(zip_path, e))?;
    }
    archive
        .finish()
        .map_err(|e| PackerError::archive(format!("Failed to write {}: {}", zip_path.display(), e)))?;
    debug!("Archived directory {} to {}", source_dir.display(), zip_path.display());
    Ok(())
}
