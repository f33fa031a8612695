//! Asset metadata serializer
//!
//! Writes [`UnityValue`] trees in the block style Unity uses for `.meta`
//! files:
//! - mapping order is preserved and aliases are never emitted
//! - null values are written as empty scalars (`userData:`)
//! - sequences inside mappings are not indented
//! - empty containers are written as `{}` / `[]`
//! - strings that would re-parse as another type are single quoted

use crate::constants::{LineEnding, META_INDENT_SIZE, RESERVED_PLAIN_SCALARS};
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::debug;
use unity_packer_core::{PackerError, Result, UnityMap, UnityValue};

/// Unity metadata YAML serializer
pub struct MetaSerializer {
    /// Line ending style to use
    line_ending: LineEnding,
    /// Indent size (Unity uses 2 spaces)
    indent_size: usize,
}

impl MetaSerializer {
    /// Create a new metadata serializer
    pub fn new() -> Self {
        Self {
            line_ending: LineEnding::default(),
            indent_size: META_INDENT_SIZE,
        }
    }

    /// Set line ending style
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Serialize a document to a YAML string
    pub fn serialize_to_string(&self, value: &UnityValue) -> Result<String> {
        let mut output = String::new();
        self.serialize_to_writer(&mut output, value)?;
        Ok(output)
    }

    /// Serialize a document to a writer
    pub fn serialize_to_writer<W: Write>(&self, writer: &mut W, value: &UnityValue) -> Result<()> {
        match value {
            UnityValue::Object(obj) if !obj.is_empty() => self.write_mapping(writer, obj, 0, false),
            UnityValue::Array(arr) if !arr.is_empty() => self.write_sequence(writer, arr, 0, false),
            scalar => {
                let text = self.scalar_text(scalar);
                self.emit(writer, &text)?;
                self.newline(writer)
            }
        }
    }

    /// Serialize a document and write it to `path`
    pub fn write_file<P: AsRef<Path>>(&self, path: P, value: &UnityValue) -> Result<()> {
        let path = path.as_ref();
        let yaml = self.serialize_to_string(value)?;
        debug!("Writing metadata to {}", path.display());
        fs::write(path, yaml).map_err(|e| PackerError::file_io(path, e))
    }

    fn emit<W: Write>(&self, writer: &mut W, text: &str) -> Result<()> {
        writer
            .write_str(text)
            .map_err(|e| PackerError::format(format!("Failed to write YAML: {}", e)))
    }

    fn newline<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.emit(writer, self.line_ending.as_str())
    }

    fn write_indent<W: Write>(&self, writer: &mut W, indent: usize) -> Result<()> {
        self.emit(writer, &" ".repeat(indent))
    }

    /// Write a block mapping at `indent`. With `inline_first` the first key
    /// continues the current line (mapping inside a sequence item).
    fn write_mapping<W: Write>(
        &self,
        writer: &mut W,
        obj: &UnityMap,
        indent: usize,
        inline_first: bool,
    ) -> Result<()> {
        for (index, (key, value)) in obj.iter().enumerate() {
            if index > 0 || !inline_first {
                self.write_indent(writer, indent)?;
            }
            self.emit(writer, &self.key_text(key))?;
            self.emit(writer, ":")?;
            self.write_mapping_value(writer, value, indent)?;
        }
        Ok(())
    }

    fn write_mapping_value<W: Write>(
        &self,
        writer: &mut W,
        value: &UnityValue,
        indent: usize,
    ) -> Result<()> {
        match value {
            UnityValue::Object(obj) if !obj.is_empty() => {
                self.newline(writer)?;
                self.write_mapping(writer, obj, indent + self.indent_size, false)
            }
            UnityValue::Array(arr) if !arr.is_empty() => {
                self.newline(writer)?;
                self.write_sequence(writer, arr, indent, false)
            }
            scalar => self.write_trailing_scalar(writer, scalar),
        }
    }

    fn write_sequence<W: Write>(
        &self,
        writer: &mut W,
        arr: &[UnityValue],
        indent: usize,
        inline_first: bool,
    ) -> Result<()> {
        for (index, item) in arr.iter().enumerate() {
            if index > 0 || !inline_first {
                self.write_indent(writer, indent)?;
            }
            self.emit(writer, "-")?;
            match item {
                UnityValue::Object(obj) if !obj.is_empty() => {
                    self.emit(writer, " ")?;
                    self.write_mapping(writer, obj, indent + self.indent_size, true)?;
                }
                UnityValue::Array(inner) if !inner.is_empty() => {
                    self.emit(writer, " ")?;
                    self.write_sequence(writer, inner, indent + self.indent_size, true)?;
                }
                scalar => self.write_trailing_scalar(writer, scalar)?,
            }
        }
        Ok(())
    }

    fn write_trailing_scalar<W: Write>(&self, writer: &mut W, value: &UnityValue) -> Result<()> {
        let text = self.scalar_text(value);
        if !text.is_empty() {
            self.emit(writer, " ")?;
            self.emit(writer, &text)?;
        }
        self.newline(writer)
    }

    fn scalar_text(&self, value: &UnityValue) -> String {
        match value {
            UnityValue::Null => String::new(),
            UnityValue::Bool(b) => b.to_string(),
            UnityValue::Integer(i) => i.to_string(),
            UnityValue::Float(f) => format_float(*f),
            UnityValue::String(s) => self.string_text(s),
            UnityValue::Array(_) => "[]".to_string(),
            UnityValue::Object(_) => "{}".to_string(),
        }
    }

    fn key_text(&self, key: &str) -> String {
        self.string_text(key)
    }

    fn string_text(&self, s: &str) -> String {
        if s.chars().any(|c| c.is_control()) {
            format!("\"{}\"", self.escape_string(s))
        } else if self.needs_quoting(s) {
            format!("'{}'", s.replace('\'', "''"))
        } else {
            s.to_string()
        }
    }

    /// Check whether a string can't be written as a plain scalar
    fn needs_quoting(&self, s: &str) -> bool {
        if s.is_empty() || s.trim() != s {
            return true;
        }
        if RESERVED_PLAIN_SCALARS.contains(&s) || looks_numeric(s) {
            return true;
        }
        let first = s.chars().next().unwrap_or(' ');
        if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
            // "-foo" is plain, "- foo" and "-" are not.
            let plain_dash = matches!(first, '-' | '?' | ':')
                && s.chars().nth(1).is_some_and(|c| !c.is_whitespace());
            if !plain_dash {
                return true;
            }
        }
        s.contains(": ") || s.contains(" #") || s.ends_with(':')
    }

    /// Escape a string for a double quoted scalar
    fn escape_string(&self, s: &str) -> String {
        let mut escaped = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '"' => escaped.push_str("\\\""),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                c if c.is_control() => escaped.push_str(&format!("\\x{:02X}", c as u32)),
                c => escaped.push(c),
            }
        }
        escaped
    }
}

impl Default for MetaSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    if body.is_empty() {
        return false;
    }
    if body.parse::<f64>().is_ok() {
        return true;
    }
    let lower = body.to_ascii_lowercase();
    lower == ".inf"
        || lower == ".nan"
        || lower.starts_with("0x")
        || lower.starts_with("0o")
        || (body.contains('_') && body.replace('_', "").parse::<f64>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(value: &UnityValue) -> String {
        MetaSerializer::new().serialize_to_string(value).unwrap()
    }

    #[test]
    fn test_null_and_empty_containers() {
        let doc = UnityValue::from_pairs([
            ("userData", UnityValue::Null),
            ("iconMap", UnityValue::object()),
            ("labels", UnityValue::Array(vec![])),
        ]);
        assert_eq!(dump(&doc), "userData:\niconMap: {}\nlabels: []\n");
    }

    #[test]
    fn test_indentless_sequence_in_mapping() {
        let doc = UnityValue::from_pairs([(
            "labels",
            UnityValue::from(vec!["gvh".to_string(), "gvh_version-1.2.3".to_string()]),
        )]);
        assert_eq!(dump(&doc), "labels:\n- gvh\n- gvh_version-1.2.3\n");
    }

    #[test]
    fn test_mapping_inside_sequence() {
        let entry = UnityValue::from_pairs([
            ("first", UnityValue::from_pairs([("Standalone", "Linux")])),
            ("second", UnityValue::from_pairs([("enabled", 1)])),
        ]);
        let doc = UnityValue::from_pairs([(
            "PluginImporter",
            UnityValue::from_pairs([("platformData", UnityValue::Array(vec![entry]))]),
        )]);
        assert_eq!(
            dump(&doc),
            "PluginImporter:\n  platformData:\n  - first:\n      Standalone: Linux\n    second:\n      enabled: 1\n"
        );
    }

    #[test]
    fn test_quoting() {
        let s = MetaSerializer::new();
        assert_eq!(s.string_text("AnyCPU"), "AnyCPU");
        assert_eq!(s.string_text("None"), "None");
        assert_eq!(s.string_text("1"), "'1'");
        assert_eq!(s.string_text("true"), "'true'");
        assert_eq!(s.string_text(""), "''");
        assert_eq!(s.string_text("a: b"), "'a: b'");
        assert_eq!(s.string_text("it's"), "it's");
        assert_eq!(s.string_text("*glob"), "'*glob'");
        assert_eq!(s.string_text("-preview"), "-preview");
        assert_eq!(s.string_text("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn test_scalars() {
        let doc = UnityValue::from_pairs([
            ("folderAsset", UnityValue::Bool(true)),
            ("scale", UnityValue::Float(1.0)),
            ("timeCreated", UnityValue::Integer(1480838400)),
        ]);
        assert_eq!(
            dump(&doc),
            "folderAsset: true\nscale: 1.0\ntimeCreated: 1480838400\n"
        );
    }

    #[test]
    fn test_windows_line_endings() {
        let doc = UnityValue::from_pairs([("a", 1), ("b", 2)]);
        let yaml = MetaSerializer::new()
            .with_line_ending(LineEnding::Windows)
            .serialize_to_string(&doc)
            .unwrap();
        assert_eq!(yaml, "a: 1\r\nb: 2\r\n");
    }
}
