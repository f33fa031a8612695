//! Unity Packer CLI
//!
//! Command-line interface to export Unity packages, import them into
//! projects and maintain GUID stores.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use unity_packer::archive::{import_packages, missing_directories, missing_files};
use unity_packer::core::DEFAULT_TIMESTAMP;
use unity_packer::export::gen_guids::DEFAULT_GUIDS_VERSION;
use unity_packer::export::{ExportRequest, ExportSettings, GenGuidsRequest, run_export, run_gen_guids};

#[derive(Parser)]
#[command(name = "unity-packer")]
#[command(about = "Build reproducible .unitypackage files and UPM tarballs")]
#[command(version)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the packages described by a project configuration
    Export(ExportArgs),

    /// Unpack .unitypackage files into Unity projects
    Import {
        /// Unity project directory, the one that contains Assets
        #[arg(long = "projects", required = true)]
        projects: Vec<PathBuf>,

        /// Package to unpack. Packages are unpacked in the order given.
        #[arg(long = "packages", required = true)]
        packages: Vec<PathBuf>,
    },

    /// Add GUIDs for asset paths to a GUID store
    GenGuids {
        /// Existing GUID store to modify
        #[arg(long)]
        guids_file: PathBuf,

        /// Plugin version the GUIDs are created for
        #[arg(long, default_value = DEFAULT_GUIDS_VERSION)]
        version: String,

        /// Replace the GUIDs of paths that already have one
        #[arg(long)]
        generate_new_guids: bool,

        /// Asset paths within the plugin
        asset_paths: Vec<String>,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Project configuration describing the packages
    #[arg(long)]
    config_file: PathBuf,

    /// GUID store
    #[arg(long)]
    guids_file: Option<PathBuf>,

    /// Version of the plugins being exported
    #[arg(long)]
    plugins_version: Option<String>,

    /// Directory containing assets. Searched in the order given.
    #[arg(long = "assets-dir", default_value = ".")]
    assets_dirs: Vec<PathBuf>,

    /// Zip file containing assets, searched after the assets directories
    #[arg(long = "assets-zip")]
    assets_zips: Vec<PathBuf>,

    /// Asset file to stage as `input[:output]`
    #[arg(long = "asset-file")]
    asset_files: Vec<String>,

    /// File copied to the output directory as `input[:output]`
    #[arg(long = "additional-file")]
    additional_files: Vec<String>,

    /// Timestamp of archive members and metadata. Negative uses each file's
    /// creation time, 0 keeps the file times.
    #[arg(long, default_value_t = DEFAULT_TIMESTAMP, allow_negative_numbers = true)]
    timestamp: i64,

    /// Owner of archive members
    #[arg(long, default_value = "root")]
    owner: String,

    /// Group of archive members
    #[arg(long, default_value = "root")]
    group: String,

    /// Build archives in process instead of with the tar command
    #[arg(long)]
    no_use_tar: bool,

    /// Accept plugin versions that are not `major.minor.patch(-preview)`
    #[arg(long)]
    no_enforce_semver: bool,

    /// Output directory
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Zip the exported files into this file instead of keeping them
    #[arg(long)]
    output_zip: Option<PathBuf>,

    /// Export .unitypackage files
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    output_unitypackage: bool,

    /// Export UPM tarballs
    #[arg(long)]
    output_upm: bool,

    /// Space separated sections to enable
    #[arg(long, value_delimiter = ' ')]
    enabled_sections: Vec<String>,
}

impl ExportArgs {
    fn into_request(self) -> ExportRequest {
        let mut settings = ExportSettings::new()
            .with_timestamp(self.timestamp)
            .with_ownership(self.owner, self.group)
            .with_native_tar(!self.no_use_tar)
            .with_enforce_semver(!self.no_enforce_semver);
        if let Some(plugins_version) = self.plugins_version {
            settings = settings.with_plugins_version(plugins_version);
        }
        ExportRequest {
            config_file: self.config_file,
            assets_dirs: self.assets_dirs,
            assets_zips: self.assets_zips,
            asset_files: self.asset_files,
            additional_files: self.additional_files,
            output_dir: self.output_dir,
            output_zip: self.output_zip,
            output_unitypackage: self.output_unitypackage,
            output_upm: self.output_upm,
            enabled_sections: self
                .enabled_sections
                .into_iter()
                .filter(|section| !section.is_empty())
                .collect::<BTreeSet<_>>(),
            guids_file: self.guids_file,
            settings,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Export(args) => export_command(args),
        Commands::Import { projects, packages } => import_command(projects, packages),
        Commands::GenGuids {
            guids_file,
            version,
            generate_new_guids,
            asset_paths,
        } => gen_guids_command(guids_file, version, generate_new_guids, asset_paths),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn export_command(args: ExportArgs) -> Result<()> {
    let config_file = args.config_file.clone();
    let summary = run_export(&args.into_request())
        .with_context(|| format!("Failed to export packages from {}", config_file.display()))?;
    for (path, build) in summary.unitypackages.iter().chain(&summary.upm_packages) {
        info!("Exported {} ({})", path.display(), build);
    }
    if let Some(output_zip) = &summary.output_zip {
        info!("Archived output to {}", output_zip.display());
    }
    Ok(())
}

fn import_command(projects: Vec<PathBuf>, packages: Vec<PathBuf>) -> Result<()> {
    let missing_packages = missing_files(&packages);
    let missing_projects = missing_directories(&projects);
    if !missing_packages.is_empty() {
        error!("Specified packages {:?} not found.", missing_packages);
    }
    if !missing_projects.is_empty() {
        error!("Specified projects {:?} not found.", missing_projects);
    }
    if !missing_packages.is_empty() || !missing_projects.is_empty() {
        bail!("Missing packages or projects");
    }

    let ignored = import_packages(&packages, &projects).context("Failed to import packages")?;
    for ignored_members in ignored {
        error!(
            "Failed to unpack files {:?} from package {}",
            ignored_members.members,
            ignored_members.package.display()
        );
    }
    Ok(())
}

fn gen_guids_command(
    guids_file: PathBuf,
    version: String,
    generate_new_guids: bool,
    asset_paths: Vec<String>,
) -> Result<()> {
    let request = GenGuidsRequest {
        guids_file,
        version,
        asset_paths,
        generate_new_guids,
    };
    let assigned = run_gen_guids(&request)
        .with_context(|| format!("Failed to update {}", request.guids_file.display()))?;
    info!("Generated {} GUIDs", assigned.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_request(args: &[&str]) -> ExportRequest {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Export(args) => args.into_request(),
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_export_defaults() {
        let request = export_request(&["unity-packer", "export", "--config-file", "project.json"]);
        assert_eq!(request.assets_dirs, [PathBuf::from(".")]);
        assert_eq!(request.output_dir, PathBuf::from("output"));
        assert!(request.output_unitypackage);
        assert!(!request.output_upm);
        assert_eq!(request.settings, ExportSettings::default());
    }

    #[test]
    fn test_export_flags() {
        let request = export_request(&[
            "unity-packer",
            "export",
            "--config-file",
            "project.json",
            "--assets-dir",
            "a",
            "--assets-dir",
            "b",
            "--enabled-sections",
            "experimental ios",
            "--output-unitypackage",
            "false",
            "--output-upm",
            "--timestamp",
            "-1",
            "--no-use-tar",
            "--plugins-version",
            "1.2.3",
        ]);
        assert_eq!(request.assets_dirs, [PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(
            request.enabled_sections.iter().map(String::as_str).collect::<Vec<_>>(),
            ["experimental", "ios"]
        );
        assert!(!request.output_unitypackage);
        assert!(request.output_upm);
        assert_eq!(request.settings.timestamp, -1);
        assert!(!request.settings.use_tar);
        assert_eq!(request.settings.plugins_version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_gen_guids_args() {
        let cli = Cli::try_parse_from([
            "unity-packer",
            "gen-guids",
            "--guids-file",
            "guids.json",
            "Plugins/A.dll",
            "Plugins/B.dll",
        ])
        .unwrap();
        match cli.command {
            Commands::GenGuids {
                version, asset_paths, ..
            } => {
                assert_eq!(version, "1.0.0");
                assert_eq!(asset_paths, ["Plugins/A.dll", "Plugins/B.dll"]);
            }
            _ => panic!("expected gen-guids command"),
        }
    }

    #[test]
    fn test_import_reports_missing_inputs() {
        let temp = tempfile::tempdir().unwrap();
        let err = import_command(
            vec![temp.path().to_path_buf()],
            vec![temp.path().join("missing.unitypackage")],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing packages or projects");
    }
}
