//! Constants and lookup tables for Unity package export
//!
//! Platform names, CPU families, label prefixes and path patterns shared by
//! the metadata engine and the package resolver.

use regex::Regex;

/// Line ending types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Unix,    // \n
    Windows, // \r\n
}

impl Default for LineEnding {
    fn default() -> Self {
        // Unity writes `.meta` files with unix line endings on every host.
        LineEnding::Unix
    }
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Windows => "\r\n",
        }
    }
}

/// Every path in a Unity plugin lives under this directory
pub const ASSETS_DIRECTORY: &str = "Assets";

/// Extension of asset metadata sidecar files
pub const ASSET_METADATA_FILE_EXTENSION: &str = ".meta";

/// Default archive timestamp (2016-12-04)
pub const DEFAULT_TIMESTAMP: i64 = 1_480_838_400;

/// Platform alias expanded to the desktop platforms of a CPU family
pub const STANDALONE_PLATFORM_ALIAS: &str = "Standalone";

/// Pseudo platform that toggles every platform at once
pub const ANY_PLATFORM: &str = "Any";

/// Platforms in the PluginImporter template, in serialization order
pub const PLUGIN_PLATFORMS: [&str; 16] = [
    "Android",
    "Any",
    "Editor",
    "Linux",
    "Linux64",
    "LinuxUniversal",
    "OSXIntel",
    "OSXIntel64",
    "OSXUniversal",
    "Web",
    "WebStreamed",
    "Win",
    "Win64",
    "WindowsStoreApps",
    "iOS",
    "tvOS",
];

/// Default platforms of a PluginImporter asset group
pub const DEFAULT_PLUGIN_PLATFORMS: [&str; 5] =
    ["Editor", "Android", "iOS", "tvOS", STANDALONE_PLATFORM_ALIAS];

/// Default CPU family of a PluginImporter asset group
pub const DEFAULT_CPU: &str = "AnyCPU";

/// Build target paired with each platform in the pair-list platformData shape.
///
/// Targets that overlap with more common ones (e.g. "Facebook") are ignored.
pub fn platform_target(platform: &str) -> Option<&'static str> {
    Some(match platform {
        "Any" => "Any",
        "Editor" => "Editor",
        "Android" => "Android",
        "Linux" | "Linux64" | "LinuxUniversal" => "Standalone",
        "OSXIntel" | "OSXIntel64" | "OSXUniversal" => "Standalone",
        "Win" | "Win64" => "Standalone",
        "Web" => "WebGL",
        "WebStreamed" => "",
        "WindowsStoreApps" => "Windows Store Apps",
        "iOS" => "iPhone",
        "tvOS" => "tvOS",
        _ => return None,
    })
}

/// Universal platform enabled alongside an architecture specific one
pub fn universal_platform(platform: &str) -> Option<&'static str> {
    match platform {
        "Linux" | "Linux64" => Some("LinuxUniversal"),
        "OSXIntel" | "OSXIntel64" => Some("OSXUniversal"),
        _ => None,
    }
}

/// Platforms able to load a native library with the given extension
pub fn platforms_for_shared_library_extension(extension: &str) -> Option<&'static [&'static str]> {
    match extension {
        "so" => Some(&["Any", "Editor", "Linux", "Linux64", "LinuxUniversal"]),
        "bundle" => Some(&["Any", "Editor", "OSXIntel", "OSXIntel64", "OSXUniversal"]),
        "dll" => Some(&["Any", "Editor", "Win", "Win64"]),
        _ => None,
    }
}

/// Desktop platforms and the CPU each one implies
pub const CPU_BY_DESKTOP_PLATFORM: [(&str, &str); 8] = [
    ("Linux", "x86"),
    ("OSXIntel", "x86"),
    ("Win", "x86"),
    ("Linux64", "x86_64"),
    ("OSXIntel64", "x86_64"),
    ("Win64", "x86_64"),
    ("LinuxUniversal", "AnyCPU"),
    ("OSXUniversal", "AnyCPU"),
];

/// CPU implied by a desktop platform
pub fn cpu_for_desktop_platform(platform: &str) -> Option<&'static str> {
    CPU_BY_DESKTOP_PLATFORM
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, cpu)| *cpu)
}

/// Desktop platforms selected by a CPU family, `None` for unknown families
pub fn desktop_platforms_for_cpu(cpu: &str) -> Option<Vec<&'static str>> {
    let platforms: Vec<&'static str> = match cpu {
        "AnyCPU" => CPU_BY_DESKTOP_PLATFORM.iter().map(|(p, _)| *p).collect(),
        "x86" | "x86_64" => CPU_BY_DESKTOP_PLATFORM
            .iter()
            .filter(|(_, c)| *c == cpu)
            .map(|(p, _)| *p)
            .collect(),
        _ => return None,
    };
    Some(platforms)
}

// Version handler labels and filenames.
pub const VERSION_HANDLER_LABEL_PREFIX: &str = "gvh";
pub const VERSION_HANDLER_VERSION_FIELD_PREFIX: &str = "version-";
pub const VERSION_HANDLER_MANIFEST_FIELD_PREFIX: &str = "manifest";
pub const VERSION_HANDLER_FIELD_SEPARATOR: &str = "_";
pub const VERSION_HANDLER_PRESERVE_LABEL_PREFIX: &str = "gvhp";
pub const VERSION_HANDLER_PRESERVE_MANIFEST_NAME_FIELD_PREFIX: &str = "manifestname-";
pub const VERSION_HANDLER_PRESERVE_EXPORT_PATH_FIELD_PREFIX: &str = "exportpath-";
pub const VERSION_HANDLER_LINUXLIBNAME_FIELD_PREFIX: &str = "linuxlibname-";

// Package manager resolver labels.
pub const UPM_RESOLVER_LABEL_PREFIX: &str = "gupmr";
pub const UPM_RESOLVER_MANIFEST_FIELD_PREFIX: &str = "manifest";
pub const UPM_RESOLVER_FIELD_SEPARATOR: &str = "_";

/// Keyword prefix linking a UPM manifest back to a legacy manifest
pub const UPM_KEYWORDS_MANIFEST_PREFIX: &str = "vh-name:";
pub const UPM_DOCUMENTATION_DIRECTORY: &str = "Documentation~";
pub const UPM_DOCUMENTATION_FILENAME: &str = "index.md";
pub const UPM_MANIFEST_FILENAME: &str = "package.json";

pub const LINUX_SHARED_LIBRARY_PREFIX: &str = "lib";
pub const LINUX_SHARED_LIBRARY_EXTENSION: &str = ".so";

lazy_static::lazy_static! {
    /// Native Linux plugin libraries, relative to the Assets directory
    pub static ref LINUX_SHARED_LIBRARY_PATH: Regex =
        Regex::new(r"^Plugins/(x86|x86_64)/(.*\.so)").expect("valid regex");

    /// Path components required for native desktop libraries
    pub static ref SHARED_LIBRARY_PATH: Regex =
        Regex::new(r"(^|/)Plugins/(x86|x86_64)/(.*/|)[^/]+\.(so|dll|bundle)$").expect("valid regex");

    /// major.minor.patch with an optional -preview suffix
    pub static ref VALID_VERSION: Regex =
        Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+(-preview)?$").expect("valid regex");

    /// 32 hex digit asset GUID
    pub static ref GUID_PATTERN: Regex =
        Regex::new(r"^[0-9a-fA-F]{32}$").expect("valid regex");
}
