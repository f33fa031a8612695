//! Tests for `.meta` serialization
//!
//! These tests verify that documents written by the serializer match the
//! layout Unity itself produces and load back unchanged.

use unity_packer_yaml::{MetaLoader, MetaSerializer, UnityValue, dump_json_pretty, load_json_str};

const PLUGIN_META: &str = "\
fileFormatVersion: 2
guid: 4d3f0f6ef1d74e4e8b2b3c8f3f3c8d2a
labels:
- gvh
- gvh_version-1.2.3
timeCreated: 1480838400
PluginImporter:
  serializedVersion: 1
  iconMap: {}
  executionOrder: {}
  isPreloaded: 0
  platformData:
    Android:
      enabled: 0
      settings:
        CPU: AnyCPU
    Any:
      enabled: 0
      settings: {}
    Editor:
      enabled: 1
      settings:
        CPU: AnyCPU
        DefaultValueInitialized: true
        OS: AnyOS
    iOS:
      enabled: 0
      settings:
        CompileFlags:
        FrameworkDependencies:
  userData:
  assetBundleName:
  assetBundleVariant:
";

const PAIR_LIST_META: &str = "\
fileFormatVersion: 2
guid: 0a1b2c3d4e5f60718293a4b5c6d7e8f9
PluginImporter:
  serializedVersion: 2
  platformData:
  - first:
      Any:
    second:
      enabled: 1
      settings: {}
  - first:
      Standalone: Linux64
    second:
      enabled: 1
      settings:
        CPU: x86_64
  isPreloaded: 0
";

/// A Unity 5 style plugin importer survives a load/dump cycle byte for byte
#[test]
fn test_plugin_meta_layout_is_stable() {
    let loader = MetaLoader::new();
    let doc = loader.load_from_str(PLUGIN_META).unwrap();

    let importer = doc.get("PluginImporter").unwrap();
    assert_eq!(importer.get("serializedVersion"), Some(&UnityValue::Integer(1)));
    assert!(importer.get("userData").unwrap().is_null());

    let yaml = MetaSerializer::new().serialize_to_string(&doc).unwrap();
    assert_eq!(yaml, PLUGIN_META);
}

/// The list-of-pairs platformData layout survives a load/dump cycle
#[test]
fn test_pair_list_meta_layout_is_stable() {
    let loader = MetaLoader::new();
    let doc = loader.load_from_str(PAIR_LIST_META).unwrap();

    let platforms = doc
        .get("PluginImporter")
        .and_then(|p| p.get("platformData"))
        .and_then(UnityValue::as_array)
        .unwrap();
    assert_eq!(platforms.len(), 2);
    assert!(platforms[0].get("first").unwrap().get("Any").unwrap().is_null());

    let yaml = MetaSerializer::new().serialize_to_string(&doc).unwrap();
    assert_eq!(yaml, PAIR_LIST_META);
}

/// Strings that look like numbers stay strings after a round trip
#[test]
fn test_numeric_strings_round_trip() {
    let doc = UnityValue::from_pairs([
        ("version", UnityValue::from("1.0")),
        ("count", UnityValue::from("42")),
        ("flag", UnityValue::from("yes")),
    ]);
    let yaml = MetaSerializer::new().serialize_to_string(&doc).unwrap();
    let reloaded = MetaLoader::new().load_from_str(&yaml).unwrap();
    assert_eq!(reloaded, doc);
}

/// JSON and YAML loaders produce the same tree for the same data
#[test]
fn test_json_and_yaml_trees_agree() {
    let from_json = load_json_str(
        r#"{"PluginImporter": {"platformData": {"Editor": {"enabled": 1}}}, "labels": ["a"]}"#,
        "inline.json",
    )
    .unwrap();
    let from_yaml = MetaLoader::new()
        .load_from_str("PluginImporter:\n  platformData:\n    Editor:\n      enabled: 1\nlabels:\n- a\n")
        .unwrap();
    assert_eq!(from_json, from_yaml);
    assert!(dump_json_pretty(&from_json).unwrap().contains("\"enabled\": 1"));
}

/// Files written to disk can be loaded again
#[test]
fn test_write_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asset.meta");
    let doc = UnityValue::from_pairs([("fileFormatVersion", UnityValue::Integer(2))]);
    MetaSerializer::new().write_file(&path, &doc).unwrap();
    assert_eq!(MetaLoader::new().load_file(&path).unwrap(), doc);
}
