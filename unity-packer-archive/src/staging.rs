//! Staging helpers
//!
//! Copying files into staging and output directories.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use unity_packer_core::{PackerError, Result, posix_path};
use walkdir::WalkDir;

/// Permission bits given to staged assets (rwxrwxr-x)
pub const STAGED_FILE_MODE: u32 = 0o775;

/// Copy a file or directory tree and make the copies readable, writable
/// and executable
pub fn copy_and_set_rwx<S: AsRef<Path>, T: AsRef<Path>>(source: S, target: T) -> Result<()> {
    let source = source.as_ref();
    let target = target.as_ref();
    debug!("Copying {} --> {}", source.display(), target.display());

    if source.is_file() {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| PackerError::file_io(parent, e))?;
        }
        fs::copy(source, target).map_err(|e| PackerError::file_io(source, e))?;
        set_rwx(target)?;
    } else if source.is_dir() {
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                PackerError::archive(format!("Failed to walk {}: {}", source.display(), e))
            })?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| PackerError::archive(e.to_string()))?;
            let destination = target.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination).map_err(|e| PackerError::file_io(&destination, e))?;
            } else {
                fs::copy(entry.path(), &destination).map_err(|e| PackerError::file_io(entry.path(), e))?;
            }
            set_rwx(&destination)?;
        }
    } else {
        return Err(PackerError::file_io(
            source,
            io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn set_rwx(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(STAGED_FILE_MODE))
        .map_err(|e| PackerError::file_io(path, e))
}

#[cfg(not(unix))]
fn set_rwx(_path: &Path) -> Result<()> {
    Ok(())
}

/// Copy files described as `input[:output]` into `output_dir`.
///
/// When the output part is missing the input path is reused. Drive and root
/// components are stripped from the output path. Returns the copied paths.
pub fn copy_files_to_dir<S: AsRef<str>, P: AsRef<Path>>(specs: &[S], output_dir: P) -> Result<Vec<String>> {
    let output_dir = output_dir.as_ref();
    let mut copied = Vec::with_capacity(specs.len());
    for spec in specs {
        let (input, output) = split_copy_spec(spec.as_ref());
        let input = posix_path(input);
        let target = output_dir.join(relative_output_path(output.unwrap_or(&input)));
        copy_and_set_rwx(&input, &target)?;
        copied.push(posix_path(target.to_string_lossy()));
    }
    Ok(copied)
}

fn split_copy_spec(spec: &str) -> (&str, Option<&str>) {
    let mut parts = spec.split(':');
    let input = parts.next().unwrap_or_default();
    (input, parts.next())
}

fn relative_output_path(output: &str) -> PathBuf {
    Path::new(output)
        .components()
        .filter(|component| !matches!(component, Component::Prefix(_) | Component::RootDir))
        .collect()
}

/// Return the first `directory/filename` that exists
pub fn find_in_dirs<P: AsRef<Path>>(filename: &str, directories: &[P]) -> Option<PathBuf> {
    directories
        .iter()
        .map(|directory| directory.as_ref().join(filename))
        .find(|candidate| candidate.exists())
}

/// Copy every regular file below `source` into `target`, keeping the
/// relative layout. Returns the number of files copied.
pub fn copy_tree<S: AsRef<Path>, T: AsRef<Path>>(source: S, target: T) -> Result<usize> {
    let source = source.as_ref();
    let target = target.as_ref();
    let mut copied = 0;
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            PackerError::archive(format!("Failed to walk {}: {}", source.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| PackerError::archive(e.to_string()))?;
        let destination = target.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| PackerError::file_io(parent, e))?;
        }
        fs::copy(entry.path(), &destination).map_err(|e| PackerError::file_io(entry.path(), e))?;
        copied += 1;
    }
    Ok(copied)
}
