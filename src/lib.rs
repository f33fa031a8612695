//! Unity Packer
//!
//! Builds byte reproducible `.unitypackage` files and Unity Package Manager
//! tarballs from a declarative project configuration, assigning every asset
//! a stable GUID across plugin releases.
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_packer::{ExportRequest, ExportSettings, run_export};
//!
//! let mut request = ExportRequest::new("export_unity_package_config.json");
//! request.assets_dirs = vec!["Assets".into()];
//! request.guids_file = Some("guids.json".into());
//! request.settings = ExportSettings::new().with_plugins_version("1.2.3");
//! run_export(&request)?;
//! # Ok::<(), unity_packer::PackerError>(())
//! ```

pub use unity_packer_archive as archive;
pub use unity_packer_core as core;
pub use unity_packer_export as export;
pub use unity_packer_yaml as yaml;

pub use unity_packer_core::{PackerError, Result, UnityMap, UnityValue};

pub use unity_packer_export::{
    ExportRequest, ExportSettings, ExportSummary, GenGuidsRequest, GuidDatabase, GuidStore, ProjectConfiguration,
    run_export, run_gen_guids,
};

pub use unity_packer_archive::{ArchiveOptions, create_archive, import_packages};
