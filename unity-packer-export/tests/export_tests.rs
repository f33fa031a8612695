//! Project export tests

use flate2::read::GzDecoder;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use unity_packer_core::{PackerError, Result, UnityValue};
use unity_packer_export::{
    ExportRequest, ExportSettings, GuidDatabase, PackageExport, PackageWriter, ProjectConfiguration, run_export,
};
use unity_packer_yaml::load_json_str;

const GUID_A: &str = "a0000000000000000000000000000001";
const GUID_B: &str = "b0000000000000000000000000000002";
const GUID_MANIFEST: &str = "c0000000000000000000000000000003";
const GUID_UPM_MANIFEST: &str = "d0000000000000000000000000000004";
const GUID_README: &str = "e0000000000000000000000000000005";
const GUID_FOLDER: &str = "f0000000000000000000000000000006";

fn write_assets(files: &[(&str, &str)]) -> TempDir {
    let assets = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let path = assets.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    assets
}

fn project(json: &str, version: Option<&str>) -> ProjectConfiguration {
    ProjectConfiguration::new(
        load_json_str(json, "project.json").unwrap(),
        BTreeSet::new(),
        version.map(str::to_string),
        false,
    )
    .unwrap()
}

fn guid_database(json: &str, version: &str) -> GuidDatabase {
    GuidDatabase::from_store(&load_json_str(json, "guids.json").unwrap(), Some(version)).unwrap()
}

fn settings() -> ExportSettings {
    ExportSettings::new().with_native_tar(false)
}

/// Read every regular file of a gzipped tarball
fn read_tarball(path: &Path) -> BTreeMap<String, String> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    let mut files = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path().unwrap().to_string_lossy().trim_start_matches("./").to_string();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        files.insert(name, content);
    }
    files
}

#[test]
fn test_include_with_different_import_settings() {
    let assets = write_assets(&[("Shared/lib.dll", "binary")]);
    let project = project(
        r#"{
            "packages": [
                {
                    "name": "A.unitypackage",
                    "imports": [{"paths": ["Shared/lib.dll"], "override_metadata": {"userData": "a"}}],
                    "includes": ["B.unitypackage"]
                },
                {
                    "name": "B.unitypackage",
                    "imports": [{"paths": ["Shared/lib.dll"], "override_metadata": {"userData": "b"}}]
                }
            ]
        }"#,
        None,
    );
    let package = project.package("A.unitypackage").unwrap();
    let err = package
        .find_assets(&project, &[assets.path()], true, false)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "File Shared/lib.dll imported with different import settings in packages [\"A.unitypackage\", \"B.unitypackage\"]"
    );

    let assets_found = package.find_assets(&project, &[assets.path()], false, false).unwrap();
    assert_eq!(assets_found.len(), 1);
    assert_eq!(
        assets_found[0].importer_metadata_original().get("userData"),
        Some(&UnityValue::from("a"))
    );
}

#[test]
fn test_write_unitypackage_with_versioned_guids() {
    let assets = write_assets(&[("Plugin/a.txt", "first"), ("Plugin/b.txt", "second")]);
    let output = tempfile::tempdir().unwrap();
    let mut project = project(
        r#"{
            "packages": [
                {
                    "name": "Plugin.unitypackage",
                    "imports": [{"paths": ["Plugin"]}],
                    "manifest_path": "Plugin/Editor"
                }
            ]
        }"#,
        Some("1.2.3"),
    );
    let store = format!(
        r#"{{
            "1.0.0": {{"Plugin/a.txt": "{a}", "Plugin/b.txt": "{manifest}"}},
            "1.2.3": {{"Plugin/b.txt": "{b}", "Plugin/Editor/Plugin_version-1.2.3_manifest.txt": "{manifest}"}}
        }}"#,
        a = GUID_A,
        b = GUID_B,
        manifest = GUID_MANIFEST
    );
    let mut database = guid_database(&store, "1.2.3");

    let exported = project
        .write(
            &mut database,
            &[assets.path().to_path_buf()],
            output.path(),
            &settings(),
            false,
        )
        .unwrap();
    let package_path = output.path().join("Plugin.unitypackage");
    assert_eq!(exported.get(&package_path).map(String::as_str), Some("<unnamed>"));

    let files = read_tarball(&package_path);
    assert_eq!(files[&format!("{}/pathname", GUID_A)], "Assets/Plugin/a.txt");
    assert_eq!(files[&format!("{}/asset", GUID_A)], "first");
    assert_eq!(files[&format!("{}/pathname", GUID_B)], "Assets/Plugin/b.txt");
    assert!(files[&format!("{}/asset.meta", GUID_B)].contains(&format!("guid: {}", GUID_B)));
    assert_eq!(
        files[&format!("{}/pathname", GUID_MANIFEST)],
        "Assets/Plugin/Editor/Plugin_version-1.2.3_manifest.txt"
    );
    assert_eq!(
        files[&format!("{}/asset", GUID_MANIFEST)],
        "Assets/Plugin/a.txt\nAssets/Plugin/b.txt\n"
    );
    assert!(files[&format!("{}/asset.meta", GUID_MANIFEST)].contains("gvh_manifest"));
}

#[test]
fn test_write_is_repeatable() {
    let assets = write_assets(&[("Plugin/a.txt", "first")]);
    let first_output = tempfile::tempdir().unwrap();
    let second_output = tempfile::tempdir().unwrap();
    let mut project = project(
        r#"{"packages": [{"name": "Plugin.unitypackage", "imports": [{"paths": ["Plugin/a.txt"]}]}]}"#,
        None,
    );
    let store = format!(r#"{{"1.0.0": {{"Plugin/a.txt": "{}"}}}}"#, GUID_A);
    let assets_dirs = [assets.path().to_path_buf()];

    for output in [&first_output, &second_output] {
        let mut database = guid_database(&store, "1.0.0");
        project
            .write(&mut database, &assets_dirs, output.path(), &settings(), false)
            .unwrap();
    }
    assert_eq!(
        fs::read(first_output.path().join("Plugin.unitypackage")).unwrap(),
        fs::read(second_output.path().join("Plugin.unitypackage")).unwrap()
    );
}

#[test]
fn test_write_upm_package() {
    let assets = write_assets(&[("Plugin/Scripts/a.cs", "class A {}"), ("README.md", "# Plugin")]);
    let output = tempfile::tempdir().unwrap();
    let mut project = project(
        r#"{
            "packages": [
                {
                    "name": "Plugin.unitypackage",
                    "export_upm": 1,
                    "imports": [{"paths": ["Plugin/Scripts/a.cs"]}],
                    "readme": "README.md",
                    "common_manifest": {
                        "name": "com.example.plugin",
                        "display_name": "Example Plugin",
                        "description": ["Line one. ", "Line two."]
                    },
                    "upm_package_config": {"manifest": {"unity": "2019.4"}}
                }
            ]
        }"#,
        Some("1.2.3"),
    );
    let store = format!(
        r#"{{"1.2.3": {{
            "Plugin/Scripts/a.cs": "{a}",
            "com.example.plugin/package.json": "{upm}",
            "com.example.plugin/README.md": "{readme}",
            "com.example.plugin/Plugin": "{folder}",
            "com.example.plugin/Plugin/Scripts": "{b}"
        }}}}"#,
        a = GUID_A,
        b = GUID_B,
        upm = GUID_UPM_MANIFEST,
        readme = GUID_README,
        folder = GUID_FOLDER
    );
    let mut database = guid_database(&store, "1.2.3");

    project
        .write(
            &mut database,
            &[assets.path().to_path_buf()],
            output.path(),
            &settings(),
            true,
        )
        .unwrap();
    let files = read_tarball(&output.path().join("com.example.plugin-1.2.3.tgz"));
    let names: Vec<&str> = files.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        [
            "package/Plugin.meta",
            "package/Plugin/Scripts.meta",
            "package/Plugin/Scripts/a.cs",
            "package/Plugin/Scripts/a.cs.meta",
            "package/README.md",
            "package/README.md.meta",
            "package/package.json",
            "package/package.json.meta",
        ]
    );

    let manifest = load_json_str(&files["package/package.json"], "package.json").unwrap();
    let keys: Vec<&str> = manifest.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        ["name", "version", "displayName", "description", "unity", "dependencies"]
    );
    assert_eq!(manifest.get("version"), Some(&UnityValue::from("1.2.3")));
    assert_eq!(
        manifest.get("description"),
        Some(&UnityValue::from("Line one. Line two."))
    );
    assert!(files["package/package.json.meta"].contains(&format!("guid: {}", GUID_UPM_MANIFEST)));
    assert!(files["package/package.json.meta"].contains("gupmr_manifest"));
    assert!(files["package/Plugin.meta"].contains(&format!("guid: {}", GUID_FOLDER)));
    assert!(files["package/Plugin.meta"].contains("folderAsset: true"));
    assert_eq!(files["package/README.md"], "# Plugin");
}

#[test]
fn test_upm_package_without_name() {
    let output = tempfile::tempdir().unwrap();
    let mut project = project(
        r#"{"packages": [{"name": "Plugin.unitypackage", "export_upm": 1}]}"#,
        Some("1.2.3"),
    );
    let err = project
        .write(&mut GuidDatabase::new(), &[], output.path(), &settings(), true)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Detected package Plugin.unitypackage has missing package name under common_manifest"
    );
}

/// Records the packages a project export asks for without writing them
#[derive(Default)]
struct RecordingWriter {
    written: RefCell<Vec<(String, String, BTreeSet<String>)>>,
    missing_guids: BTreeMap<String, Vec<String>>,
}

impl RecordingWriter {
    fn record(&self, export: &PackageExport<'_>) -> Result<PathBuf> {
        if let Some(paths) = self.missing_guids.get(export.package.name()) {
            return Err(PackerError::missing_guids(paths.clone()));
        }
        self.written.borrow_mut().push((
            export.package.name().to_string(),
            export.package_filename.to_string(),
            export.project.selected_sections().clone(),
        ));
        Ok(export.output_path())
    }
}

impl PackageWriter for RecordingWriter {
    fn write_unitypackage(&self, export: &PackageExport<'_>, _guid_database: &mut GuidDatabase) -> Result<PathBuf> {
        self.record(export)
    }

    fn write_upm(&self, export: &PackageExport<'_>, _guid_database: &mut GuidDatabase) -> Result<PathBuf> {
        self.record(export)
    }
}

const BUILDS_PROJECT: &str = r#"{
    "packages": [
        {"name": "Core.unitypackage"},
        {"name": "Experimental.unitypackage", "sections": ["experimental"]}
    ],
    "builds": [
        {"name": "stable"},
        {
            "name": "preview",
            "enabled_sections": ["experimental"],
            "package_name_replacements": [
                {"match": "^(.*)\\.unitypackage$", "replacement": "\\1-preview.unitypackage"}
            ]
        }
    ]
}"#;

#[test]
fn test_builds_rename_and_enable_sections() {
    let output = tempfile::tempdir().unwrap();
    let mut project = project(BUILDS_PROJECT, None);
    let writer = RecordingWriter::default();
    let exported = project
        .write_with(&writer, &mut GuidDatabase::new(), &[], output.path(), &settings(), false)
        .unwrap();

    let written: Vec<(String, String)> = writer
        .written
        .borrow()
        .iter()
        .map(|(package, filename, _)| (package.clone(), filename.clone()))
        .collect();
    assert_eq!(
        written,
        [
            ("Core.unitypackage".to_string(), "Core.unitypackage".to_string()),
            ("Core.unitypackage".to_string(), "Core-preview.unitypackage".to_string()),
            (
                "Experimental.unitypackage".to_string(),
                "Experimental-preview.unitypackage".to_string()
            ),
        ]
    );
    assert_eq!(
        exported.values().map(String::as_str).collect::<Vec<_>>(),
        ["stable", "preview", "preview"]
    );
    assert!(writer.written.borrow()[2].2.contains("experimental"));
    assert!(project.selected_sections().is_empty());
    assert_eq!(project.package_names(), ["Core.unitypackage"]);
}

#[test]
fn test_builds_exporting_the_same_file() {
    let output = tempfile::tempdir().unwrap();
    let mut project = project(
        r#"{
            "packages": [{"name": "Core.unitypackage"}],
            "builds": [{"name": "first"}, {"name": "second"}]
        }"#,
        None,
    );
    let writer = RecordingWriter::default();
    let err = project
        .write_with(&writer, &mut GuidDatabase::new(), &[], output.path(), &settings(), false)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Detected multiple builds exporting packages to the same file(s).\nCore.unitypackage exported by multiple builds [\"first\", \"second\"]"
    );
    assert!(writer.written.borrow().is_empty());
}

#[test]
fn test_missing_guids_are_reported_together() {
    let output = tempfile::tempdir().unwrap();
    let mut project = project(
        r#"{"packages": [{"name": "A.unitypackage"}, {"name": "B.unitypackage"}, {"name": "C.unitypackage"}]}"#,
        None,
    );
    let mut writer = RecordingWriter::default();
    writer
        .missing_guids
        .insert("A.unitypackage".to_string(), vec!["z.txt".to_string()]);
    writer
        .missing_guids
        .insert("C.unitypackage".to_string(), vec!["y.txt".to_string(), "z.txt".to_string()]);
    let err = project
        .write_with(&writer, &mut GuidDatabase::new(), &[], output.path(), &settings(), false)
        .unwrap_err();
    assert_eq!(err.missing_guid_paths(), Some(&["y.txt".to_string(), "z.txt".to_string()][..]));
    assert_eq!(writer.written.borrow().len(), 1);
}

#[test]
fn test_run_export_to_zip() {
    let workspace = write_assets(&[
        ("assets/Plugin/a.txt", "first"),
        ("notes.txt", "notes"),
        (
            "project.json",
            r#"{"packages": [{"name": "Plugin.unitypackage", "imports": [{"paths": ["Plugin/a.txt"]}]}]}"#,
        ),
    ]);
    let guids_file = workspace.path().join("guids.json");
    fs::write(&guids_file, format!(r#"{{"1.0.0": {{"Plugin/a.txt": "{}"}}}}"#, GUID_A)).unwrap();

    let mut request = ExportRequest::new(workspace.path().join("project.json"));
    request.assets_dirs = vec![workspace.path().join("assets")];
    request.guids_file = Some(guids_file);
    request.additional_files = vec![format!("{}:docs/notes.txt", workspace.path().join("notes.txt").display())];
    request.output_zip = Some(workspace.path().join("out.zip"));
    request.output_dir = workspace.path().join("unused");
    request.settings = settings().with_plugins_version("1.0.0");

    let summary = run_export(&request).unwrap();
    assert_eq!(summary.output_zip, Some(workspace.path().join("out.zip")));
    assert_eq!(
        summary.unitypackages.keys().collect::<Vec<_>>(),
        [&PathBuf::from("Plugin.unitypackage")]
    );
    assert_eq!(summary.additional_files, ["docs/notes.txt"]);
    assert!(workspace.path().join("out.zip").is_file());
    assert!(!workspace.path().join("unused").exists());
}

#[test]
fn test_run_export_reports_duplicate_store_guids() {
    let workspace = write_assets(&[("project.json", r#"{"packages": []}"#)]);
    let guids_file = workspace.path().join("guids.json");
    fs::write(
        &guids_file,
        format!(r#"{{"1.0.0": {{"a.txt": "{g}", "b.txt": "{g}"}}}}"#, g = GUID_A),
    )
    .unwrap();

    let mut request = ExportRequest::new(workspace.path().join("project.json"));
    request.guids_file = Some(guids_file);
    request.output_dir = workspace.path().join("output");
    request.settings = settings().with_plugins_version("1.0.0");
    let err = run_export(&request).unwrap_err();
    assert!(matches!(err, PackerError::DuplicateGuids { .. }));
}
