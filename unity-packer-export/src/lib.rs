//! Unity Packer Export
//!
//! Turns a declarative project document into `.unitypackage` files and UPM
//! tarballs: metadata templates, the GUID database, package and build
//! resolution and the package writers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_packer_export::{ExportRequest, ExportSettings, run_export};
//!
//! let mut request = ExportRequest::new("export_unity_package_config.json");
//! request.guids_file = Some("guids.json".into());
//! request.settings = ExportSettings::new().with_plugins_version("1.2.3");
//! let summary = run_export(&request)?;
//! for (path, build) in &summary.unitypackages {
//!     println!("{} ({})", path.display(), build);
//! }
//! # Ok::<(), unity_packer_export::PackerError>(())
//! ```

pub use unity_packer_core::{PackerError, Result};

pub mod asset;
pub mod config;
pub mod export;
pub mod gen_guids;
pub mod guid_database;
pub mod labels;
pub mod manifest;
pub mod metadata;
pub mod settings;
pub mod writer;

pub use asset::Asset;
pub use config::{AssetGroup, BuildConfiguration, PackageConfiguration, ProjectConfiguration};
pub use export::{ExportRequest, ExportSummary, run_export};
pub use gen_guids::{GenGuidsRequest, GuidStore, run_gen_guids};
pub use guid_database::{DuplicateGuidChecker, GuidDatabase};
pub use manifest::ManifestKind;
pub use metadata::ImporterKind;
pub use settings::ExportSettings;
pub use writer::{ArchivePackageWriter, PackageExport, PackageWriter};
