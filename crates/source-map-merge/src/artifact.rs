/*
 * artifact.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Generated files and their `sourceMappingURL` references

use crate::context::TableId;
use crate::error::{MergeError, Result};
use crate::utils::{parent_dir, relative_path, resolve_path};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io;
use std::path::{Path, PathBuf};

/// The marker preceding a source map reference
pub const MAPPING_URL_PREFIX: &str = "# sourceMappingURL=";

/// Prefix of an embedded (base64 JSON) source map
pub const DATA_URL_PREFIX: &str = "data:application/json;base64,";

/// Other embedded prefixes accepted when reading
const DATA_URL_PREFIX_VARIANTS: &[&str] = &[
    DATA_URL_PREFIX,
    "data:application/json;charset=utf-8;base64,",
];

/// Closing tag of a block-comment reference (CSS)
const BLOCK_COMMENT_SUFFIX: &str = " */";

/// A `sourceMappingURL` reference found in a generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapReference {
    /// Byte offset where the reference value starts
    pub start: usize,
    /// The value with quotes and comment close removed
    pub value: String,
    /// Closing comment tag to re-emit after the value, if any
    pub suffix: &'static str,
}

/// What a reference value points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceValue {
    /// Base64 payload of an embedded source map
    Embedded(String),
    /// Path of an external source map, relative to the generated file
    External(PathBuf),
}

impl ReferenceValue {
    pub fn classify(value: &str) -> Self {
        match DATA_URL_PREFIX_VARIANTS
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix))
        {
            Some(payload) => ReferenceValue::Embedded(payload.to_string()),
            None => ReferenceValue::External(PathBuf::from(value)),
        }
    }
}

/// Find the last `sourceMappingURL` reference in `content`
pub fn find_reference(content: &str) -> Option<SourceMapReference> {
    let start = content.rfind(MAPPING_URL_PREFIX)? + MAPPING_URL_PREFIX.len();
    let mut value = content[start..].trim();
    let mut suffix = "";

    if let Some(stripped) = value.strip_suffix("*/") {
        value = stripped.trim();
        suffix = BLOCK_COMMENT_SUFFIX;
    }

    for quote in ['"', '\''] {
        if let Some(unquoted) = value.strip_prefix(quote) {
            value = unquoted.strip_suffix(quote).unwrap_or(unquoted);
            break;
        }
    }

    Some(SourceMapReference {
        start,
        value: value.to_string(),
        suffix,
    })
}

/// Encode serialized source map JSON as a reference value
pub fn embedded_reference(json: &str) -> String {
    format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(json.as_bytes()))
}

/// Decode the payload of an embedded reference into JSON bytes
pub fn decode_embedded(artifact: &Path, payload: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload.trim())
        .map_err(|source| MergeError::InvalidEmbeddedTable {
            artifact: artifact.to_path_buf(),
            source,
        })
}

/// A generated file that may reference a source map
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    path: PathBuf,
    content: String,
    /// Whether the file existed when it was opened
    exists: bool,
    reference: Option<SourceMapReference>,
    /// Where [`GeneratedArtifact::persist`] writes; defaults to `path`
    target: PathBuf,
    pub(crate) table: Option<TableId>,
}

impl GeneratedArtifact {
    /// Read the file at `path` (absolute).
    ///
    /// A missing file is an error unless `tolerate_missing`, in which case it
    /// is treated as empty. Tolerant opens also decode invalid UTF-8 lossily,
    /// since such files are only read for their text.
    pub fn read(path: &Path, tolerate_missing: bool) -> Result<Self> {
        let read_error = |source| MergeError::Read {
            path: path.to_path_buf(),
            source,
        };
        let (content, exists) = match std::fs::read(path) {
            Ok(bytes) if tolerate_missing => (String::from_utf8_lossy(&bytes).into_owned(), true),
            Ok(bytes) => {
                let content = String::from_utf8(bytes)
                    .map_err(|e| read_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
                (content, true)
            }
            Err(e) if tolerate_missing && e.kind() == io::ErrorKind::NotFound => {
                (String::new(), false)
            }
            Err(source) => return Err(read_error(source)),
        };
        Ok(Self::from_content(path, content, exists))
    }

    /// Build an artifact from in-memory content
    pub fn from_content(path: &Path, content: String, exists: bool) -> Self {
        let reference = find_reference(&content);
        GeneratedArtifact {
            path: path.to_path_buf(),
            content,
            exists,
            reference,
            target: path.to_path_buf(),
            table: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn reference(&self) -> Option<&SourceMapReference> {
        self.reference.as_ref()
    }

    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn set_target(&mut self, target: PathBuf) {
        self.target = target;
    }

    /// Absolute path of the source map an external reference value names
    pub fn resolve_reference(&self, value: &Path) -> PathBuf {
        resolve_path(parent_dir(&self.path), value)
    }

    /// `target` relative to this file's directory
    pub fn relative_path_from(&self, target: &Path) -> String {
        relative_path(parent_dir(&self.path), target)
    }

    /// Replace the reference value in the content.
    ///
    /// Only the text is rewritten here; the caller re-derives the table.
    pub(crate) fn rewrite_reference(&mut self, value: &str) {
        let trailing_newline = self.content.ends_with('\n');
        let (start, suffix) = match &self.reference {
            Some(reference) => (reference.start, reference.suffix),
            None => {
                if !self.content.is_empty() && !trailing_newline {
                    self.content.push('\n');
                }
                self.content.push_str("//");
                self.content.push_str(MAPPING_URL_PREFIX);
                (self.content.len(), "")
            }
        };

        self.content.truncate(start);
        self.content.push_str(value);
        self.content.push_str(suffix);
        if trailing_newline {
            self.content.push('\n');
        }
        self.reference = Some(SourceMapReference {
            start,
            value: value.to_string(),
            suffix,
        });
    }

    /// Write the current content to the output target
    pub fn persist(&self) -> Result<()> {
        std::fs::write(&self.target, &self.content).map_err(|source| MergeError::Write {
            path: self.target.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_reference_line_comment() {
        let content = "console.log(1);\n//# sourceMappingURL=out.js.map\n";
        let reference = find_reference(content).unwrap();

        assert_eq!(reference.value, "out.js.map");
        assert_eq!(reference.suffix, "");
        assert_eq!(&content[reference.start..reference.start + 10], "out.js.map");
    }

    #[test]
    fn test_find_reference_block_comment() {
        let content = "a{color:red}\n/*# sourceMappingURL=style.css.map */";
        let reference = find_reference(content).unwrap();

        assert_eq!(reference.value, "style.css.map");
        assert_eq!(reference.suffix, " */");
    }

    #[test]
    fn test_find_reference_quoted() {
        let content = "x;\n//# sourceMappingURL='out.js.map'";
        assert_eq!(find_reference(content).unwrap().value, "out.js.map");

        let content = "x;\n//# sourceMappingURL=\"out.js.map\"";
        assert_eq!(find_reference(content).unwrap().value, "out.js.map");
    }

    #[test]
    fn test_find_reference_unbalanced_quote() {
        let content = "x;\n//# sourceMappingURL=\"out.map é";
        assert_eq!(find_reference(content).unwrap().value, "out.map é");

        let content = "x;\n//# sourceMappingURL='é'";
        assert_eq!(find_reference(content).unwrap().value, "é");
    }

    #[test]
    fn test_find_reference_uses_last_marker() {
        let content = "//# sourceMappingURL=old.map\nx;\n//# sourceMappingURL=new.map";
        assert_eq!(find_reference(content).unwrap().value, "new.map");
    }

    #[test]
    fn test_find_reference_absent() {
        assert!(find_reference("let x = 1;\n").is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ReferenceValue::classify("data:application/json;base64,e30="),
            ReferenceValue::Embedded("e30=".to_string())
        );
        assert_eq!(
            ReferenceValue::classify("data:application/json;charset=utf-8;base64,e30="),
            ReferenceValue::Embedded("e30=".to_string())
        );
        assert_eq!(
            ReferenceValue::classify("../maps/out.js.map"),
            ReferenceValue::External(PathBuf::from("../maps/out.js.map"))
        );
    }

    #[test]
    fn test_embedded_round_trip() {
        let value = embedded_reference("{\"version\":3}");
        let ReferenceValue::Embedded(payload) = ReferenceValue::classify(&value) else {
            panic!("Expected embedded reference");
        };
        let bytes = decode_embedded(Path::new("/a.js"), &payload).unwrap();
        assert_eq!(bytes, b"{\"version\":3}");
    }

    #[test]
    fn test_decode_embedded_invalid() {
        let err = decode_embedded(Path::new("/a.js"), "!!not base64!!").unwrap_err();
        assert!(matches!(err, MergeError::InvalidEmbeddedTable { .. }));
    }

    #[test]
    fn test_rewrite_reference_keeps_suffix_and_newline() {
        let mut artifact = GeneratedArtifact::from_content(
            Path::new("/proj/style.css"),
            "a{}\n/*# sourceMappingURL=old.map */\n".to_string(),
            true,
        );
        artifact.rewrite_reference("new.map");

        assert_eq!(artifact.content(), "a{}\n/*# sourceMappingURL=new.map */\n");
        assert_eq!(artifact.reference().unwrap().value, "new.map");
    }

    #[test]
    fn test_rewrite_reference_appends_when_missing() {
        let mut artifact =
            GeneratedArtifact::from_content(Path::new("/proj/a.js"), "x;".to_string(), true);
        artifact.rewrite_reference("a.js.map");

        assert_eq!(artifact.content(), "x;\n//# sourceMappingURL=a.js.map");
        assert_eq!(find_reference(artifact.content()).unwrap().value, "a.js.map");
    }

    #[test]
    fn test_read_tolerant_decodes_lossily() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("latin1.ts");
        std::fs::write(&path, b"caf\xe9;\n").unwrap();

        let artifact = GeneratedArtifact::read(&path, true).unwrap();
        assert!(artifact.exists());
        assert_eq!(artifact.content(), "caf\u{fffd};\n");

        let err = GeneratedArtifact::read(&path, false).unwrap_err();
        assert!(matches!(err, MergeError::Read { .. }));
    }

    #[test]
    fn test_read_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("gone.js");

        let artifact = GeneratedArtifact::read(&path, true).unwrap();
        assert!(!artifact.exists());
        assert_eq!(artifact.content(), "");
        assert!(GeneratedArtifact::read(&path, false).is_err());
    }

    #[test]
    fn test_relative_path_from() {
        let artifact =
            GeneratedArtifact::from_content(Path::new("/proj/dist/a.js"), String::new(), false);
        assert_eq!(
            artifact.relative_path_from(Path::new("/proj/maps/a.js.map")),
            "../maps/a.js.map"
        );
        assert_eq!(
            artifact.resolve_reference(Path::new("a.js.map")),
            PathBuf::from("/proj/dist/a.js.map")
        );
    }
}
