//! Error types for Unity package export

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for package export operations
pub type Result<T> = std::result::Result<T, PackerError>;

/// Main error type for package export operations
#[derive(Error, Debug)]
pub enum PackerError {
    /// IO errors when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// IO errors tied to a specific file
    #[error("Failed to access {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or YAML document that failed to parse
    #[error("Failed to load {} ({message})", path.display())]
    Parse { path: PathBuf, message: String },

    /// Serializer failures
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed or contradictory project configuration
    #[error("{0}")]
    ProjectConfiguration(String),

    /// Assets for which no GUID could be resolved
    #[error(
        "There were asset paths without a known guid. Generate guids for these assets:\n\n\"{}\"",
        paths.join("\" \"")
    )]
    MissingGuids { paths: Vec<String> },

    /// GUIDs shared by more than one export path
    #[error("Found duplicate GUIDs that map to multiple paths.\n{}", format_paths_by_guid(paths_by_guid))]
    DuplicateGuids {
        paths_by_guid: BTreeMap<String, BTreeSet<String>>,
    },

    /// GUID store entry that is not a 32 character hex string
    #[error("Version {version}, asset path {path} references invalid GUID {guid}")]
    InvalidGuid {
        version: String,
        path: String,
        guid: String,
    },

    /// Archive creation failures
    #[error("Archive error: {0}")]
    Archive(String),
}

fn format_paths_by_guid(paths_by_guid: &BTreeMap<String, BTreeSet<String>>) -> String {
    paths_by_guid
        .iter()
        .map(|(guid, paths)| {
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            format!("{} --> {:?}", guid, paths)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl PackerError {
    /// Create a project configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ProjectConfiguration(message.into())
    }

    /// Create a format error
    pub fn format<S: Into<String>>(message: S) -> Self {
        Self::Format(message.into())
    }

    /// Create a parse error for a file
    pub fn parse<P: AsRef<Path>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Wrap an IO error with the file it refers to
    pub fn file_io<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        Self::FileIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an archive error
    pub fn archive<S: Into<String>>(message: S) -> Self {
        Self::Archive(message.into())
    }

    /// Create a missing GUID error, sorting and de-duplicating the paths
    pub fn missing_guids<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        Self::MissingGuids {
            paths: paths.into_iter().collect(),
        }
    }

    /// Paths carried by a missing GUID error
    pub fn missing_guid_paths(&self) -> Option<&[String]> {
        match self {
            Self::MissingGuids { paths } => Some(paths),
            _ => None,
        }
    }
}
