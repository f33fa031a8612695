//! Unity Packer Archive
//!
//! Byte reproducible `.unitypackage` / UPM tarball assembly, `.unitypackage`
//! unpacking and zip helpers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_packer_archive::{ArchiveOptions, create_archive};
//!
//! let options = ArchiveOptions::new().with_native_tar(false);
//! create_archive("output/Plugin.unitypackage", "staging", &options)?;
//! # Ok::<(), unity_packer_archive::PackerError>(())
//! ```

pub use unity_packer_core::{PackerError, Result};

pub mod archive;
pub mod staging;
pub mod unpack;
pub mod zip_io;

pub use archive::{ArchiveOptions, create_archive, staged_entries};
pub use staging::{copy_and_set_rwx, copy_files_to_dir, copy_tree, find_in_dirs};
pub use unpack::{IgnoredMembers, import_packages, missing_directories, missing_files, unpack_to_directory};
pub use zip_io::{extract_zip, extract_zip_to_temp_dir, write_zipfile};
