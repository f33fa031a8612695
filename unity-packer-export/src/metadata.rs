//! Importer metadata templates and transforms
//!
//! Builds the importer section of an asset's `.meta` document from a
//! declarative platform/CPU selection and normalizes plugin platform data.
//!
//! Plugin platform data comes in two serialized shapes:
//!
//! - `serializedVersion: 1` stores a mapping of platform name to options.
//! - Later versions store a list of `{first: {target: name}, second: options}`
//!   pairs, optionally wrapped in `{data: ...}`.
//!
//! [`PlatformData`] gives both shapes the same view so the transforms below
//! are written once.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};
use unity_packer_core::tree_access::{get_array, get_i64_or, get_str};
use unity_packer_core::{
    ANY_PLATFORM, PLUGIN_PLATFORMS, PackerError, Result, SHARED_LIBRARY_PATH, STANDALONE_PLATFORM_ALIAS,
    UnityMap, UnityValue, cpu_for_desktop_platform, desktop_platforms_for_cpu, platform_target,
    platforms_for_shared_library_extension, posix_path, universal_platform,
};

const PAIR_FIRST: &str = "first";
const PAIR_SECOND: &str = "second";
const PAIR_WRAPPER: &str = "data";
const UNSET_CPU: &str = "None";

/// Metadata fields shared by every asset
pub fn default_metadata() -> UnityValue {
    UnityValue::from_pairs([
        ("fileFormatVersion", UnityValue::from(2)),
        ("guid", UnityValue::Null),
        ("labels", UnityValue::Null),
        ("timeCreated", UnityValue::from(0)),
    ])
}

fn default_importer_fields() -> Vec<(&'static str, UnityValue)> {
    vec![
        ("userData", UnityValue::Null),
        ("assetBundleName", UnityValue::Null),
        ("assetBundleVariant", UnityValue::Null),
    ]
}

/// Importer used when Unity can infer the asset type
pub fn default_importer_metadata() -> UnityValue {
    UnityValue::from_pairs([("DefaultImporter", UnityValue::from_pairs(default_importer_fields()))])
}

/// Metadata of a folder asset
pub fn folder_metadata() -> UnityValue {
    UnityValue::from_pairs([
        ("folderAsset", UnityValue::from(true)),
        ("DefaultImporter", UnityValue::from_pairs(default_importer_fields())),
    ])
}

/// Disabled options of a plugin platform
pub fn platform_template(platform: &str) -> Option<UnityValue> {
    let settings = match platform {
        "Android" | "WindowsStoreApps" => UnityValue::from_pairs([("CPU", "AnyCPU")]),
        "Any" | "Web" | "WebStreamed" => UnityValue::object(),
        "Editor" => UnityValue::from_pairs([
            ("CPU", UnityValue::from("AnyCPU")),
            ("DefaultValueInitialized", UnityValue::from(true)),
            ("OS", UnityValue::from("AnyOS")),
        ]),
        // Unity expects disabled desktop platforms to have no CPU.
        "Linux" | "Linux64" | "LinuxUniversal" | "OSXIntel" | "OSXIntel64" | "OSXUniversal" | "Win"
        | "Win64" => UnityValue::from_pairs([("CPU", UNSET_CPU)]),
        "iOS" | "tvOS" => UnityValue::from_pairs([
            ("CompileFlags", UnityValue::Null),
            ("FrameworkDependencies", UnityValue::Null),
        ]),
        _ => return None,
    };
    Some(UnityValue::from_pairs([
        ("enabled", UnityValue::from(0)),
        ("settings", settings),
    ]))
}

/// Plugin importer with every platform disabled
pub fn plugin_importer_metadata() -> UnityValue {
    let platform_data: UnityMap = PLUGIN_PLATFORMS
        .iter()
        .filter_map(|platform| platform_template(platform).map(|options| (platform.to_string(), options)))
        .collect();
    let mut importer = vec![
        ("serializedVersion", UnityValue::from(1)),
        ("iconMap", UnityValue::object()),
        ("executionOrder", UnityValue::object()),
        ("isPreloaded", UnityValue::from(0)),
        ("platformData", UnityValue::Object(platform_data)),
    ];
    importer.extend(default_importer_fields());
    UnityValue::from_pairs([("PluginImporter", UnityValue::from_pairs(importer))])
}

/// Importer selected by an asset group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterKind {
    Default,
    Plugin,
}

impl ImporterKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "DefaultImporter" => Some(Self::Default),
            "PluginImporter" => Some(Self::Plugin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "DefaultImporter",
            Self::Plugin => "PluginImporter",
        }
    }
}

/// Build importer metadata for a platform and CPU selection.
///
/// `Standalone` expands to the desktop platforms of `cpu` and their universal
/// platforms. Fails when `Standalone` is requested with an unknown CPU.
pub fn build_importer_metadata<S: AsRef<str>>(
    kind: ImporterKind,
    platforms: &BTreeSet<String>,
    cpu: &str,
    labels: &[S],
) -> Result<UnityValue> {
    let mut metadata = match kind {
        ImporterKind::Default => default_importer_metadata(),
        ImporterKind::Plugin => {
            let mut selected = platforms.clone();
            if selected.remove(STANDALONE_PLATFORM_ALIAS) {
                let desktop = desktop_platforms_for_cpu(cpu)
                    .ok_or_else(|| PackerError::configuration(format!("Unknown cpu type {}", cpu)))?;
                for platform in desktop {
                    selected.insert(platform.to_string());
                    if let Some(universal) = universal_platform(platform) {
                        selected.insert(universal.to_string());
                    }
                }
            }

            let mut metadata = plugin_importer_metadata();
            if let Some(PlatformData::LegacyMap(platform_data)) = PlatformData::from_metadata(&mut metadata) {
                for platform in &selected {
                    let options = platform_data
                        .entry(platform.clone())
                        .or_insert_with(UnityValue::object);
                    options.insert("enabled", 1);
                }
            }
            set_cpu_for_desktop_platforms(&mut metadata);
            set_cpu_for_android(&mut metadata, cpu);
            metadata
        }
    };
    add_labels(&mut metadata, labels.iter().map(|label| label.as_ref().to_string()));
    Ok(metadata)
}

/// Merge `from` into `into`.
///
/// Mappings merge key by key. Lists made only of `{first, second}` pairs merge
/// by the value of `first`. Any other value in `from` replaces the value in
/// `into`.
pub fn merge_override(into: &mut UnityValue, from: &UnityValue) {
    let (Some(into_map), Some(from_map)) = (into.as_object_mut(), from.as_object()) else {
        return;
    };
    for (key, from_value) in from_map {
        if let Some(into_value) = into_map.get_mut(key).filter(|value| !value.is_null()) {
            merge_value(into_value, from_value);
        } else {
            into_map.insert(key.clone(), from_value.clone());
        }
    }
}

fn merge_value(into: &mut UnityValue, from: &UnityValue) {
    if into.is_object() && from.is_object() {
        merge_override(into, from);
    } else if is_pair_list(into) && is_pair_list(from) {
        merge_pair_lists(into, from);
    } else {
        *into = from.clone();
    }
}

fn is_pair_list(value: &UnityValue) -> bool {
    value.as_array().is_some_and(|items| {
        !items.is_empty()
            && items.iter().all(|item| {
                item.as_object().is_some_and(|pair| {
                    pair.len() == 2 && pair.contains_key(PAIR_FIRST) && pair.contains_key(PAIR_SECOND)
                })
            })
    })
}

fn merge_pair_lists(into: &mut UnityValue, from: &UnityValue) {
    let (Some(into_items), Some(from_items)) = (into.as_array_mut(), from.as_array()) else {
        return;
    };
    for from_item in from_items {
        let key = from_item.get(PAIR_FIRST);
        match into_items.iter().position(|item| item.get(PAIR_FIRST) == key) {
            Some(index) => merge_override(&mut into_items[index], from_item),
            None => into_items.push(from_item.clone()),
        }
    }
}

/// Add labels to a metadata document, keeping the label list sorted and
/// unique. An existing empty label list is removed.
pub fn add_labels<I, S>(metadata: &mut UnityValue, labels: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let existing: Option<Vec<String>> = get_array(metadata, "labels").map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    });
    let mut merged: BTreeSet<String> = existing.iter().flatten().cloned().collect();
    merged.extend(labels.into_iter().map(Into::into));
    if !merged.is_empty() {
        metadata.insert("labels", merged.into_iter().collect::<Vec<String>>());
    } else if existing.is_some() {
        metadata.remove("labels");
    }
}

/// Serialized shape of plugin platform data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformDataShape {
    LegacyMap,
    PairList,
}

/// Mutable view over the platform data of a plugin importer
#[derive(Debug)]
pub enum PlatformData<'a> {
    /// `serializedVersion: 1` mapping of platform name to options
    LegacyMap(&'a mut UnityMap),
    /// List of `{first, second}` pairs, optionally wrapped in `{data: ...}`
    PairList(&'a mut Vec<UnityValue>),
}

/// One platform and its options
#[derive(Debug)]
pub struct PlatformEntry<'a> {
    pub name: String,
    pub options: &'a mut UnityValue,
}

impl PlatformEntry<'_> {
    pub fn is_enabled(&self) -> bool {
        self.options.get("enabled").is_some_and(UnityValue::is_truthy)
    }

    /// Set `settings.CPU`, creating the settings when needed
    pub fn set_cpu(&mut self, cpu: &str) {
        if let Some(settings) = self.options.entry_object("settings") {
            settings.insert("CPU", cpu);
        }
    }

    /// Whether the CPU is missing or `None`
    pub fn cpu_unset(&self) -> bool {
        self.options
            .get("settings")
            .and_then(|settings| get_str(settings, "CPU"))
            .is_none_or(|cpu| cpu == UNSET_CPU)
    }
}

impl<'a> PlatformData<'a> {
    /// Select the shape from `PluginImporter.serializedVersion`.
    ///
    /// Returns `None` for documents without plugin platform data or whose data
    /// does not match the declared version.
    pub fn from_metadata(metadata: &'a mut UnityValue) -> Option<Self> {
        let importer = metadata.get_mut("PluginImporter")?;
        let version = get_i64_or(importer, "serializedVersion", 1);
        match importer.get_mut("platformData")? {
            UnityValue::Object(map) if version == 1 => Some(Self::LegacyMap(map)),
            UnityValue::Array(list) if version != 1 => Some(Self::PairList(list)),
            _ => None,
        }
    }

    pub fn shape(&self) -> PlatformDataShape {
        match self {
            Self::LegacyMap(_) => PlatformDataShape::LegacyMap,
            Self::PairList(_) => PlatformDataShape::PairList,
        }
    }

    /// Names of the platforms present, in document order
    pub fn platform_names(&self) -> Vec<String> {
        match self {
            Self::LegacyMap(map) => map.keys().cloned().collect(),
            Self::PairList(list) => list.iter().filter_map(|entry| pair_name(pair_body(entry))).collect(),
        }
    }

    /// Every platform with options that are a mapping
    pub fn entries_mut(&mut self) -> Vec<PlatformEntry<'_>> {
        match self {
            Self::LegacyMap(map) => map
                .iter_mut()
                .filter(|(_, options)| options.is_object())
                .map(|(name, options)| PlatformEntry {
                    name: name.clone(),
                    options,
                })
                .collect(),
            Self::PairList(list) => list
                .iter_mut()
                .filter_map(|entry| {
                    let body = pair_body_mut(entry);
                    let name = pair_name(body)?;
                    let options = body.get_mut(PAIR_SECOND).filter(|options| options.is_object())?;
                    Some(PlatformEntry { name, options })
                })
                .collect(),
        }
    }

    /// Options of a single platform
    pub fn entry_mut(&mut self, platform: &str) -> Option<PlatformEntry<'_>> {
        self.entries_mut().into_iter().find(|entry| entry.name == platform)
    }

    /// The `enabled` value of the Any platform when it is set
    pub fn any_enabled(&self) -> Option<UnityValue> {
        let options = match self {
            Self::LegacyMap(map) => map.get(ANY_PLATFORM),
            Self::PairList(list) => list
                .iter()
                .map(pair_body)
                .find(|body| {
                    body.get(PAIR_FIRST)
                        .is_some_and(|first| first.contains_key(ANY_PLATFORM))
                })
                .and_then(|body| body.get(PAIR_SECOND)),
        }?;
        options.get("enabled").filter(|enabled| enabled.is_truthy()).cloned()
    }

    /// Append a platform that is not present yet
    pub fn add_platform(&mut self, platform: &str, enabled: UnityValue) {
        match self {
            Self::LegacyMap(map) => {
                let mut options = platform_template(platform).unwrap_or_else(UnityValue::object);
                options.insert("enabled", enabled);
                map.insert(platform.to_string(), options);
            }
            Self::PairList(list) => {
                let wrapped = list.last().is_some_and(|entry| entry.contains_key(PAIR_WRAPPER));
                let target = platform_target(platform).unwrap_or_default();
                let mut entry = UnityValue::from_pairs([
                    (PAIR_FIRST, UnityValue::from_pairs([(target, platform)])),
                    (PAIR_SECOND, UnityValue::from_pairs([("enabled", enabled)])),
                ]);
                if wrapped {
                    entry = UnityValue::from_pairs([(PAIR_WRAPPER, entry)]);
                }
                list.push(entry);
            }
        }
    }
}

fn pair_body(entry: &UnityValue) -> &UnityValue {
    entry.get(PAIR_WRAPPER).unwrap_or(entry)
}

fn pair_body_mut(entry: &mut UnityValue) -> &mut UnityValue {
    let wrapped = matches!(&*entry, UnityValue::Object(map) if map.contains_key(PAIR_WRAPPER));
    if !wrapped {
        return entry;
    }
    match entry {
        UnityValue::Object(map) => &mut map[PAIR_WRAPPER],
        _ => unreachable!("checked above"),
    }
}

/// Platform named by the `first` mapping of a pair: its value, or its key
/// when the value is empty (`{Any: }`)
fn pair_name(body: &UnityValue) -> Option<String> {
    let (target, name) = body.get(PAIR_FIRST)?.as_object()?.iter().next()?;
    Some(
        name.as_str()
            .filter(|name| !name.is_empty())
            .unwrap_or(target)
            .to_string(),
    )
}

/// Assign the platform's CPU to every enabled desktop platform without one
pub fn set_cpu_for_desktop_platforms(metadata: &mut UnityValue) {
    let Some(mut platform_data) = PlatformData::from_metadata(metadata) else {
        return;
    };
    for mut entry in platform_data.entries_mut() {
        if !entry.is_enabled() {
            continue;
        }
        let Some(cpu) = cpu_for_desktop_platform(&entry.name) else {
            continue;
        };
        if entry.cpu_unset() {
            entry.set_cpu(cpu);
        }
    }
}

/// Set the Android CPU when Android is enabled. The CPU is not validated.
pub fn set_cpu_for_android(metadata: &mut UnityValue, cpu: &str) {
    let Some(mut platform_data) = PlatformData::from_metadata(metadata) else {
        return;
    };
    if let Some(mut android) = platform_data.entry_mut("Android") {
        if android.is_enabled() {
            android.set_cpu(cpu);
        }
    }
}

/// Propagate an enabled Any platform to every platform.
///
/// Template platforms take the Any value and missing ones are added with it.
/// In the pair-list shape every listed platform takes the value. Nothing
/// changes when Any is absent or disabled.
pub fn apply_any_platform_selection(metadata: &mut UnityValue) {
    let Some(mut platform_data) = PlatformData::from_metadata(metadata) else {
        return;
    };
    let Some(any_enabled) = platform_data.any_enabled() else {
        return;
    };
    let shape = platform_data.shape();
    for entry in platform_data.entries_mut() {
        if shape == PlatformDataShape::LegacyMap && !PLUGIN_PLATFORMS.contains(&entry.name.as_str()) {
            continue;
        }
        entry.options.insert("enabled", any_enabled.clone());
    }
    let present: BTreeSet<String> = platform_data.platform_names().into_iter().collect();
    for platform in PLUGIN_PLATFORMS {
        if !present.contains(platform) {
            platform_data.add_platform(platform, any_enabled.clone());
        }
    }
}

/// Disable platforms a native shared library cannot be loaded on.
///
/// Only applies to `.so`, `.bundle` and `.dll` files below `Plugins/x86` or
/// `Plugins/x86_64`. Disabled platforms are reset to their template and Any
/// is disabled.
pub fn disable_unsupported_platforms(metadata: &mut UnityValue, filename: &str) {
    let filename = normalize_path(filename);
    if !SHARED_LIBRARY_PATH.is_match(&filename) {
        return;
    }
    let Some(supported) = Path::new(&filename)
        .extension()
        .and_then(|extension| platforms_for_shared_library_extension(&extension.to_string_lossy()))
    else {
        return;
    };

    let serialized_version = metadata
        .get("PluginImporter")
        .map(|importer| get_i64_or(importer, "serializedVersion", 1))
        .unwrap_or(1);
    if serialized_version != 1 {
        warn!(
            "Unsupported platformData version {}. Unable to configure platforms for shared library {}",
            serialized_version, filename
        );
        return;
    }
    let Some(PlatformData::LegacyMap(platform_data)) = PlatformData::from_metadata(metadata) else {
        return;
    };

    let disable: BTreeSet<String> = platform_data
        .keys()
        .filter(|platform| !supported.contains(&platform.as_str()))
        .cloned()
        .collect();
    if disable.is_empty() {
        return;
    }
    let any = platform_data
        .entry(ANY_PLATFORM.to_string())
        .or_insert_with(UnityValue::object);
    if !any.is_object() {
        *any = UnityValue::object();
    }
    any.insert("enabled", 0);

    for platform in &disable {
        let options = platform_template(platform)
            .unwrap_or_else(|| UnityValue::from_pairs([("enabled", 0)]));
        platform_data.insert(platform.clone(), options);
    }
    debug!("Disabled platforms {:?} for {}", disable, filename);
}

/// Collapse `.` and `..` components of a posix path
fn normalize_path(path: &str) -> String {
    let posix = posix_path(path);
    let absolute = posix.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in posix.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push(part);
                }
            }
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unity_packer_core::tree_access::get_object;

    fn platform<'a>(metadata: &'a UnityValue, name: &str) -> &'a UnityValue {
        metadata
            .get("PluginImporter")
            .and_then(|importer| importer.get("platformData"))
            .and_then(|data| data.get(name))
            .unwrap()
    }

    fn enabled(metadata: &UnityValue, name: &str) -> i64 {
        get_i64_or(platform(metadata, name), "enabled", 0)
    }

    fn cpu<'a>(metadata: &'a UnityValue, name: &str) -> Option<&'a str> {
        platform(metadata, name).get("settings").and_then(|s| get_str(s, "CPU"))
    }

    fn selection(platforms: &[&str]) -> BTreeSet<String> {
        platforms.iter().map(|p| p.to_string()).collect()
    }

    fn pair(target: &str, name: Option<&str>, enabled: i64) -> UnityValue {
        UnityValue::from_pairs([
            ("first", UnityValue::from_pairs([(target, UnityValue::from(name))])),
            (
                "second",
                UnityValue::from_pairs([
                    ("enabled", UnityValue::from(enabled)),
                    ("settings", UnityValue::object()),
                ]),
            ),
        ])
    }

    fn pair_list_metadata(entries: Vec<UnityValue>) -> UnityValue {
        UnityValue::from_pairs([(
            "PluginImporter",
            UnityValue::from_pairs([
                ("serializedVersion", UnityValue::from(2)),
                ("platformData", UnityValue::from(entries)),
            ]),
        )])
    }

    #[test]
    fn test_plugin_template_platform_order() {
        let metadata = plugin_importer_metadata();
        let data = metadata
            .get("PluginImporter")
            .and_then(|importer| get_object(importer, "platformData"))
            .unwrap();
        let names: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(names, PLUGIN_PLATFORMS);
        assert_eq!(cpu(&metadata, "Linux"), Some("None"));
        assert_eq!(cpu(&metadata, "Editor"), Some("AnyCPU"));
    }

    #[test]
    fn test_build_default_importer() {
        let metadata =
            build_importer_metadata(ImporterKind::Default, &BTreeSet::new(), "AnyCPU", &["gvh"]).unwrap();
        assert!(metadata.contains_key("DefaultImporter"));
        assert_eq!(metadata.get("labels"), Some(&UnityValue::from(vec!["gvh".to_string()])));
    }

    #[test]
    fn test_build_plugin_importer_standalone_x86_64() {
        let metadata = build_importer_metadata::<&str>(
            ImporterKind::Plugin,
            &selection(&["Editor", "Standalone"]),
            "x86_64",
            &[],
        )
        .unwrap();
        for name in ["Editor", "Linux64", "OSXIntel64", "Win64", "LinuxUniversal", "OSXUniversal"] {
            assert_eq!(enabled(&metadata, name), 1, "{}", name);
        }
        for name in ["Linux", "OSXIntel", "Win", "Android", "iOS", "Any"] {
            assert_eq!(enabled(&metadata, name), 0, "{}", name);
        }
        assert_eq!(cpu(&metadata, "Linux64"), Some("x86_64"));
        assert_eq!(cpu(&metadata, "LinuxUniversal"), Some("AnyCPU"));
        assert_eq!(cpu(&metadata, "Linux"), Some("None"));
        assert!(!metadata.contains_key("labels"));
    }

    #[test]
    fn test_build_plugin_importer_unknown_cpu() {
        let err = build_importer_metadata::<&str>(
            ImporterKind::Plugin,
            &selection(&["Standalone"]),
            "Crusoe",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown cpu type Crusoe"));
    }

    #[test]
    fn test_build_plugin_importer_android_cpu_is_verbatim() {
        let metadata =
            build_importer_metadata::<&str>(ImporterKind::Plugin, &selection(&["Android"]), "ARMv7", &[])
                .unwrap();
        assert_eq!(enabled(&metadata, "Android"), 1);
        assert_eq!(cpu(&metadata, "Android"), Some("ARMv7"));
    }

    #[test]
    fn test_build_plugin_importer_unknown_platform_is_added() {
        let metadata =
            build_importer_metadata::<&str>(ImporterKind::Plugin, &selection(&["Facebook"]), "AnyCPU", &[])
                .unwrap();
        assert_eq!(enabled(&metadata, "Facebook"), 1);
    }

    #[test]
    fn test_importer_kind_parse() {
        assert_eq!(ImporterKind::parse("PluginImporter"), Some(ImporterKind::Plugin));
        assert_eq!(ImporterKind::parse("TextureImporter"), None);
        assert_eq!(ImporterKind::Default.as_str(), "DefaultImporter");
    }

    #[test]
    fn test_merge_override_nested_maps() {
        let mut base = plugin_importer_metadata();
        let overrides = UnityValue::from_pairs([(
            "PluginImporter",
            UnityValue::from_pairs([(
                "platformData",
                UnityValue::from_pairs([(
                    "Editor",
                    UnityValue::from_pairs([("enabled", 1)]),
                )]),
            )]),
        )]);
        merge_override(&mut base, &overrides);
        assert_eq!(enabled(&base, "Editor"), 1);
        assert_eq!(cpu(&base, "Editor"), Some("AnyCPU"));
    }

    #[test]
    fn test_merge_override_replaces_null_and_scalars() {
        let mut base = default_metadata();
        let overrides = UnityValue::from_pairs([
            ("guid", UnityValue::from("0123")),
            ("fileFormatVersion", UnityValue::from(3)),
        ]);
        merge_override(&mut base, &overrides);
        assert_eq!(get_str(&base, "guid"), Some("0123"));
        assert_eq!(get_i64_or(&base, "fileFormatVersion", 0), 3);
    }

    #[test]
    fn test_merge_override_pair_lists() {
        let mut base = pair_list_metadata(vec![
            pair("Any", None, 0),
            pair("Editor", Some("Editor"), 0),
        ]);
        let overrides = pair_list_metadata(vec![
            pair("Editor", Some("Editor"), 1),
            pair("Standalone", Some("Linux64"), 1),
        ]);
        merge_override(&mut base, &overrides);
        let data = base
            .get("PluginImporter")
            .and_then(|importer| get_array(importer, "platformData"))
            .unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[1], pair("Editor", Some("Editor"), 1));
        assert_eq!(data[2], pair("Standalone", Some("Linux64"), 1));
    }

    #[test]
    fn test_merge_override_identity() {
        let documents = [
            plugin_importer_metadata(),
            pair_list_metadata(vec![pair("Any", None, 1), pair("Editor", Some("Editor"), 0)]),
        ];
        for document in documents {
            let mut merged = document.clone();
            merge_override(&mut merged, &UnityValue::object());
            assert_eq!(merged, document);

            let mut merged = UnityValue::object();
            merge_override(&mut merged, &document);
            assert_eq!(merged, document);
        }
    }

    #[test]
    fn test_add_labels() {
        let mut metadata = UnityValue::from_pairs([("labels", vec!["b".to_string(), "a".to_string()])]);
        add_labels(&mut metadata, ["c", "a"]);
        assert_eq!(
            metadata.get("labels"),
            Some(&UnityValue::from(vec!["a".to_string(), "b".to_string(), "c".to_string()]))
        );

        let mut empty = UnityValue::from_pairs([("labels", Vec::<String>::new())]);
        add_labels(&mut empty, Vec::<String>::new());
        assert!(!empty.contains_key("labels"));

        let mut untouched = default_metadata();
        add_labels(&mut untouched, Vec::<String>::new());
        assert_eq!(untouched.get("labels"), Some(&UnityValue::Null));
    }

    fn all_enabled() -> UnityValue {
        let mut metadata = plugin_importer_metadata();
        if let Some(mut platform_data) = PlatformData::from_metadata(&mut metadata) {
            for entry in platform_data.entries_mut() {
                entry.options.insert("enabled", 1);
            }
        }
        metadata
    }

    #[test]
    fn test_disable_unsupported_platforms_bundle() {
        let mut metadata = all_enabled();
        disable_unsupported_platforms(&mut metadata, "Plugins/x86/Foo/bar.bundle");
        let expected_enabled = ["Editor", "OSXIntel", "OSXIntel64", "OSXUniversal"];
        for name in PLUGIN_PLATFORMS {
            let expected = i64::from(expected_enabled.contains(&name));
            assert_eq!(enabled(&metadata, name), expected, "{}", name);
        }
        assert_eq!(cpu(&metadata, "Linux"), Some("None"));
    }

    #[test]
    fn test_disable_unsupported_platforms_ignores_other_paths() {
        let mut metadata = all_enabled();
        let original = metadata.clone();
        disable_unsupported_platforms(&mut metadata, "Plugins/noarch/libFoo.so");
        disable_unsupported_platforms(&mut metadata, "Plugins/x86/Foo/bar.cs");
        assert_eq!(metadata, original);
    }

    #[test]
    fn test_disable_unsupported_platforms_pair_list_is_unchanged() {
        let mut metadata = pair_list_metadata(vec![pair("Any", None, 1)]);
        let original = metadata.clone();
        disable_unsupported_platforms(&mut metadata, "Plugins/x86_64/bar.dll");
        assert_eq!(metadata, original);
    }

    #[test]
    fn test_apply_any_legacy() {
        let mut metadata = plugin_importer_metadata();
        if let Some(PlatformData::LegacyMap(data)) = PlatformData::from_metadata(&mut metadata) {
            data.shift_remove("tvOS");
            data.get_mut("Any").unwrap().insert("enabled", 1);
        }
        apply_any_platform_selection(&mut metadata);
        for name in PLUGIN_PLATFORMS {
            assert_eq!(enabled(&metadata, name), 1, "{}", name);
        }
        assert!(platform(&metadata, "tvOS").get("settings").is_some());
    }

    #[test]
    fn test_apply_any_disabled_is_noop() {
        let mut metadata = plugin_importer_metadata();
        let original = metadata.clone();
        apply_any_platform_selection(&mut metadata);
        assert_eq!(metadata, original);
    }

    #[test]
    fn test_apply_any_pair_list() {
        let mut metadata = pair_list_metadata(vec![
            pair("Any", None, 1),
            pair("Editor", Some("Editor"), 0),
        ]);
        apply_any_platform_selection(&mut metadata);
        let data = metadata
            .get("PluginImporter")
            .and_then(|importer| get_array(importer, "platformData"))
            .unwrap();
        assert_eq!(data.len(), PLUGIN_PLATFORMS.len());
        for entry in data {
            assert_eq!(entry.get("second").and_then(|s| s.get("enabled")), Some(&UnityValue::from(1)));
        }
        let linux = data
            .iter()
            .find(|entry| entry.get("first").is_some_and(|f| f.get("Standalone") == Some(&UnityValue::from("Linux"))));
        assert!(linux.is_some());
    }

    #[test]
    fn test_apply_any_pair_list_keeps_data_wrapper() {
        let wrap = |entry: UnityValue| UnityValue::from_pairs([("data", entry)]);
        let mut metadata = pair_list_metadata(vec![wrap(pair("Any", None, 1))]);
        apply_any_platform_selection(&mut metadata);
        let data = metadata
            .get("PluginImporter")
            .and_then(|importer| get_array(importer, "platformData"))
            .unwrap();
        assert!(data.iter().all(|entry| entry.contains_key("data")));
    }

    #[test]
    fn test_apply_any_is_idempotent_after_disabling() {
        let mut metadata = all_enabled();
        apply_any_platform_selection(&mut metadata);
        disable_unsupported_platforms(&mut metadata, "Plugins/x86_64/bar.dll");
        let once = metadata.clone();
        apply_any_platform_selection(&mut metadata);
        assert_eq!(metadata, once);
        assert_eq!(enabled(&metadata, "Android"), 0);
    }

    #[test]
    fn test_apply_any_is_idempotent_while_any_is_enabled() {
        let mut metadata = plugin_importer_metadata();
        if let Some(PlatformData::LegacyMap(data)) = PlatformData::from_metadata(&mut metadata) {
            data.shift_remove("tvOS");
            data.get_mut("Any").unwrap().insert("enabled", 1);
        }
        apply_any_platform_selection(&mut metadata);
        let once = metadata.clone();
        apply_any_platform_selection(&mut metadata);
        assert_eq!(metadata, once);
        assert_eq!(enabled(&metadata, "Any"), 1);
        assert_eq!(enabled(&metadata, "tvOS"), 1);

        let mut metadata = pair_list_metadata(vec![
            pair("Any", None, 1),
            pair("Standalone", Some("Win64"), 0),
        ]);
        apply_any_platform_selection(&mut metadata);
        let once = metadata.clone();
        apply_any_platform_selection(&mut metadata);
        assert_eq!(metadata, once);
    }

    #[test]
    fn test_apply_any_legacy_leaves_unknown_platforms() {
        let mut metadata = plugin_importer_metadata();
        if let Some(PlatformData::LegacyMap(data)) = PlatformData::from_metadata(&mut metadata) {
            data.get_mut("Any").unwrap().insert("enabled", 1);
            data.insert(
                "Switch".to_string(),
                UnityValue::from_pairs([("enabled", UnityValue::from(0))]),
            );
        }
        apply_any_platform_selection(&mut metadata);
        assert_eq!(enabled(&metadata, "Switch"), 0);
        assert_eq!(enabled(&metadata, "Android"), 1);
    }

    #[test]
    fn test_set_cpu_for_desktop_pair_list() {
        let mut metadata = pair_list_metadata(vec![
            pair("Standalone", Some("Win64"), 1),
            pair("Standalone", Some("Win"), 0),
        ]);
        set_cpu_for_desktop_platforms(&mut metadata);
        let data = metadata
            .get("PluginImporter")
            .and_then(|importer| get_array(importer, "platformData"))
            .unwrap();
        let cpu_of = |entry: &UnityValue| {
            entry
                .get("second")
                .and_then(|s| s.get("settings"))
                .and_then(|s| get_str(s, "CPU"))
                .map(str::to_string)
        };
        assert_eq!(cpu_of(&data[0]).as_deref(), Some("x86_64"));
        assert_eq!(cpu_of(&data[1]), None);
    }

    #[test]
    fn test_set_cpu_keeps_explicit_cpu() {
        let mut metadata = all_enabled();
        if let Some(mut platform_data) = PlatformData::from_metadata(&mut metadata) {
            platform_data.entry_mut("Win").unwrap().set_cpu("x86_64");
        }
        set_cpu_for_desktop_platforms(&mut metadata);
        assert_eq!(cpu(&metadata, "Win"), Some("x86_64"));
        assert_eq!(cpu(&metadata, "Linux"), Some("x86"));
    }

    #[test]
    fn test_platform_data_shapes() {
        let mut legacy = plugin_importer_metadata();
        assert_eq!(
            PlatformData::from_metadata(&mut legacy).map(|d| d.shape()),
            Some(PlatformDataShape::LegacyMap)
        );
        let mut pairs = pair_list_metadata(vec![pair("Any", None, 0)]);
        let data = PlatformData::from_metadata(&mut pairs).unwrap();
        assert_eq!(data.shape(), PlatformDataShape::PairList);
        assert_eq!(data.platform_names(), ["Any"]);
        let mut plain = default_importer_metadata();
        assert!(PlatformData::from_metadata(&mut plain).is_none());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("Plugins/./x86/../x86/a.so"), "Plugins/x86/a.so");
        assert_eq!(normalize_path("../a"), "../a");
        assert_eq!(normalize_path("a\\b"), "a/b");
    }
}
