//! Reproducible archive assembly
//!
//! Packs a staged directory into a gzip compressed tar file whose bytes only
//! depend on the staged content. Entries are sorted, owner and group are
//! forced and the gzip header carries no wall clock time.
//!
//! When the `tar` executable is on the path it is used directly, otherwise
//! the archive is written in process with the `tar` and `flate2` crates.

use filetime::FileTime;
use flate2::{Compression, GzBuilder};
use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::UNIX_EPOCH;
use tar::{EntryType, Header};
use tracing::{debug, info};
use unity_packer_core::{DEFAULT_TIMESTAMP, PackerError, Result, posix_path};
use walkdir::WalkDir;

/// Options controlling archive metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Modification time applied to every entry. Zero or less keeps the
    /// modification time of each staged file.
    pub timestamp: i64,
    /// Owner name written to each entry
    pub owner: String,
    /// Group name written to each entry
    pub group: String,
    /// Use the `tar` executable when it is available
    pub use_tar: bool,
}

impl ArchiveOptions {
    /// Create options with the default timestamp and `root` ownership
    pub fn new() -> Self {
        Self {
            timestamp: DEFAULT_TIMESTAMP,
            owner: "root".to_string(),
            group: "root".to_string(),
            use_tar: true,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_ownership<O: Into<String>, G: Into<String>>(mut self, owner: O, group: G) -> Self {
        self.owner = owner.into();
        self.group = group.into();
        self
    }

    pub fn with_native_tar(mut self, use_tar: bool) -> Self {
        self.use_tar = use_tar;
        self
    }

    /// Modification time forced onto entries, if any
    pub fn forced_mtime(&self) -> Option<u64> {
        u64::try_from(self.timestamp).ok().filter(|t| *t > 0)
    }
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Tar implementation found on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TarFlavor {
    Gnu,
    Bsd,
}

/// List every file and directory below `input_dir`, sorted, as relative
/// POSIX paths
pub fn staged_entries<P: AsRef<Path>>(input_dir: P) -> Result<Vec<String>> {
    let input_dir = input_dir.as_ref();
    let mut entries = Vec::new();
    for entry in WalkDir::new(input_dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            PackerError::archive(format!("Failed to walk {}: {}", input_dir.display(), e))
        })?;
        let relative = entry
            .path()
            .strip_prefix(input_dir)
            .map_err(|e| PackerError::archive(e.to_string()))?;
        entries.push(posix_path(relative.to_string_lossy()));
    }
    entries.sort();
    Ok(entries)
}

/// Create a gzip compressed tar archive from the contents of `input_dir`
pub fn create_archive<A, I>(archive_path: A, input_dir: I, options: &ArchiveOptions) -> Result<()>
where
    A: AsRef<Path>,
    I: AsRef<Path>,
{
    let archive_path = std::path::absolute(archive_path.as_ref())?;
    let input_dir = input_dir.as_ref();
    let entries = staged_entries(input_dir)?;

    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent).map_err(|e| PackerError::file_io(parent, e))?;
    }

    match native_tar(options) {
        Some(tar) => write_with_native_tar(&tar, &archive_path, input_dir, &entries, options)?,
        None => write_in_process(&archive_path, input_dir, &entries, options)?,
    }
    info!("Created {} ({} entries)", archive_path.display(), entries.len());
    Ok(())
}

#[cfg(unix)]
fn native_tar(options: &ArchiveOptions) -> Option<PathBuf> {
    if !options.use_tar {
        return None;
    }
    which::which("tar").ok()
}

#[cfg(not(unix))]
fn native_tar(_options: &ArchiveOptions) -> Option<PathBuf> {
    None
}

fn detect_flavor(tar: &Path) -> TarFlavor {
    match Command::new(tar).arg("--version").output() {
        Ok(output) if String::from_utf8_lossy(&output.stdout).contains("GNU tar") => TarFlavor::Gnu,
        _ => TarFlavor::Bsd,
    }
}

fn write_with_native_tar(
    tar: &Path,
    archive_path: &Path,
    input_dir: &Path,
    entries: &[String],
    options: &ArchiveOptions,
) -> Result<()> {
    // The entry list goes through a file to stay clear of command line limits.
    let list_dir = tempfile::tempdir()?;
    let list_path = list_dir.path().join("input_files.txt");
    let list: String = entries.iter().map(|entry| format!("{}\n", entry)).collect();
    fs::write(&list_path, list).map_err(|e| PackerError::file_io(&list_path, e))?;

    let mut command = Command::new(tar);
    command.arg("-c").arg("-z").arg("-f").arg(archive_path);
    match detect_flavor(tar) {
        TarFlavor::Gnu => {
            if let Some(mtime) = options.forced_mtime() {
                command.arg(format!("--mtime=@{}", mtime));
            }
            command
                .arg(format!("--owner={}", options.owner))
                .arg(format!("--group={}", options.group))
                .arg("--no-recursion");
        }
        TarFlavor::Bsd => {
            // BSD tar has no mtime override, so stamp the staged files instead.
            if let Some(mtime) = options.forced_mtime() {
                let time = FileTime::from_unix_time(mtime as i64, 0);
                for entry in entries {
                    let path = input_dir.join(entry);
                    filetime::set_file_mtime(&path, time).map_err(|e| PackerError::file_io(&path, e))?;
                }
            }
            command.arg("-n");
        }
    }
    command
        .arg("-T")
        .arg(&list_path)
        .current_dir(input_dir)
        .env("GZIP", "-n");

    debug!("Running {:?}", command);
    let status = command
        .status()
        .map_err(|e| PackerError::archive(format!("Failed to run {}: {}", tar.display(), e)))?;
    if !status.success() {
        return Err(PackerError::archive(format!(
            "{} failed to create {} ({})",
            tar.display(),
            archive_path.display(),
            status
        )));
    }
    Ok(())
}

/// Name stored in the gzip header. Unity on Windows only opens archives
/// whose inner name ends with `.tar`.
fn gzip_member_name(archive_path: &Path) -> String {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.tar", stem)
}

fn write_in_process(
    archive_path: &Path,
    input_dir: &Path,
    entries: &[String],
    options: &ArchiveOptions,
) -> Result<()> {
    let file = File::create(archive_path).map_err(|e| PackerError::file_io(archive_path, e))?;
    let mtime = options.forced_mtime().map_or(0, |t| u32::try_from(t).unwrap_or(u32::MAX));
    let encoder = GzBuilder::new()
        .filename(gzip_member_name(archive_path))
        .mtime(mtime)
        .write(BufWriter::new(file), Compression::default());

    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        append_entry(&mut builder, input_dir, entry, options)?;
    }
    let mut writer = builder.into_inner()?.finish()?;
    writer.flush()?;
    Ok(())
}

fn append_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    input_dir: &Path,
    entry: &str,
    options: &ArchiveOptions,
) -> Result<()> {
    let path = input_dir.join(entry);
    let metadata = fs::metadata(&path).map_err(|e| PackerError::file_io(&path, e))?;

    let mut header = Header::new_ustar();
    header.set_mode(permission_bits(&metadata));
    header.set_mtime(options.forced_mtime().unwrap_or_else(|| modified_time(&metadata)));
    header.set_uid(0);
    header.set_gid(0);
    header.set_username(&options.owner)?;
    header.set_groupname(&options.group)?;

    let appended = if metadata.is_dir() {
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        builder.append_data(&mut header, entry, io::empty())
    } else {
        header.set_entry_type(EntryType::Regular);
        header.set_size(metadata.len());
        let file = File::open(&path).map_err(|e| PackerError::file_io(&path, e))?;
        builder.append_data(&mut header, entry, file)
    };
    appended.map_err(|e| PackerError::file_io(&path, e))
}

fn modified_time(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.is_dir() { 0o755 } else { 0o644 }
}
