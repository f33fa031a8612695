//! Version handler labels and filenames
//!
//! Labels and filenames understood by the Unity plugin version handler, which
//! uses them to find and clean up assets of older plugin versions.

use std::path::Path;
use unity_packer_core::{
    LINUX_SHARED_LIBRARY_EXTENSION, LINUX_SHARED_LIBRARY_PATH, LINUX_SHARED_LIBRARY_PREFIX,
    UPM_RESOLVER_FIELD_SEPARATOR, UPM_RESOLVER_LABEL_PREFIX, UPM_RESOLVER_MANIFEST_FIELD_PREFIX,
    VERSION_HANDLER_FIELD_SEPARATOR, VERSION_HANDLER_LABEL_PREFIX, VERSION_HANDLER_LINUXLIBNAME_FIELD_PREFIX,
    VERSION_HANDLER_MANIFEST_FIELD_PREFIX, VERSION_HANDLER_PRESERVE_EXPORT_PATH_FIELD_PREFIX,
    VERSION_HANDLER_PRESERVE_LABEL_PREFIX, VERSION_HANDLER_PRESERVE_MANIFEST_NAME_FIELD_PREFIX,
    VERSION_HANDLER_VERSION_FIELD_PREFIX,
};

/// Build a version handler tag.
///
/// With `is_label` the tag starts with `gvh`. A field is followed by its value
/// with underscores replaced by dashes, so the separator stays unambiguous.
pub fn version_handler_tag(is_label: bool, field: Option<&str>, value: Option<&str>) -> String {
    let mut components: Vec<String> = Vec::new();
    if is_label {
        components.push(VERSION_HANDLER_LABEL_PREFIX.to_string());
    }
    if let Some(field) = field {
        match value {
            Some(value) => components.push(format!("{}{}", field, value.replace('_', "-"))),
            None => components.push(field.to_string()),
        }
    }
    components.join(VERSION_HANDLER_FIELD_SEPARATOR)
}

/// Insert version handler fields into a filename, before its extension.
///
/// `Foo/my_plugin.txt` with `[("version-", "1.2.3")]` becomes
/// `Foo/my-plugin_version-1.2.3.txt`.
pub fn version_handler_filename(filename: &str, fields: &[(&str, Option<&str>)]) -> String {
    let (directory, basename) = match filename.rsplit_once('/') {
        Some((directory, basename)) => (Some(directory), basename),
        None => (None, filename),
    };
    let (stem, extension) = split_extension(basename);
    let tags: Vec<String> = fields
        .iter()
        .map(|(field, value)| version_handler_tag(false, Some(field), *value))
        .collect();
    let renamed = format!(
        "{}{}{}{}",
        stem.replace('_', "-"),
        VERSION_HANDLER_FIELD_SEPARATOR,
        tags.join(VERSION_HANDLER_FIELD_SEPARATOR),
        extension
    );
    match directory {
        Some(directory) => format!("{}/{}", directory, renamed),
        None => renamed,
    }
}

/// Split `name.ext` into `("name", ".ext")`. Leading dots do not start an
/// extension.
fn split_extension(basename: &str) -> (&str, &str) {
    match basename.rfind('.') {
        Some(index) if basename[..index].chars().any(|c| c != '.') => basename.split_at(index),
        _ => (basename, ""),
    }
}

/// Labels every asset of a versioned package carries
pub fn package_labels(version: Option<&str>) -> Vec<String> {
    match version {
        Some(version) => vec![
            version_handler_tag(true, None, None),
            version_handler_tag(true, Some(VERSION_HANDLER_VERSION_FIELD_PREFIX), Some(version)),
        ],
        None => Vec::new(),
    }
}

/// Label preserving the path an asset was exported to
pub fn export_path_label(filename: &str) -> String {
    format!(
        "{}{}{}{}",
        VERSION_HANDLER_PRESERVE_LABEL_PREFIX,
        VERSION_HANDLER_FIELD_SEPARATOR,
        VERSION_HANDLER_PRESERVE_EXPORT_PATH_FIELD_PREFIX,
        filename
    )
}

/// Label naming the library of a Linux shared library plugin, if `filename`
/// is one
pub fn linux_library_label(filename: &str) -> Option<String> {
    let captures = LINUX_SHARED_LIBRARY_PATH.captures(filename)?;
    let library_path = captures.get(2)?.as_str();
    let mut basename = Path::new(library_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(stripped) = basename.strip_prefix(LINUX_SHARED_LIBRARY_PREFIX) {
        basename = stripped.to_string();
    }
    if let Some(stripped) = basename.strip_suffix(LINUX_SHARED_LIBRARY_EXTENSION) {
        basename = stripped.to_string();
    }
    Some(version_handler_tag(
        true,
        Some(VERSION_HANDLER_LINUXLIBNAME_FIELD_PREFIX),
        Some(&basename),
    ))
}

/// Label marking a legacy manifest
pub fn manifest_label() -> String {
    version_handler_tag(true, Some(VERSION_HANDLER_MANIFEST_FIELD_PREFIX), None)
}

/// Label preserving a manifest's package name. `priority` 0 is the display
/// name, higher values are aliases.
pub fn manifest_name_label(priority: usize, name: &str) -> String {
    format!(
        "{}{}{}{}{}",
        VERSION_HANDLER_PRESERVE_LABEL_PREFIX,
        VERSION_HANDLER_FIELD_SEPARATOR,
        VERSION_HANDLER_PRESERVE_MANIFEST_NAME_FIELD_PREFIX,
        priority,
        name
    )
}

/// Label marking a UPM package manifest
pub fn upm_manifest_label() -> String {
    format!(
        "{}{}{}",
        UPM_RESOLVER_LABEL_PREFIX, UPM_RESOLVER_FIELD_SEPARATOR, UPM_RESOLVER_MANIFEST_FIELD_PREFIX
    )
}
