/*
 * table.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Decoded source maps and their declared sources

use crate::codec::DecodedMappings;
use crate::context::ArtifactId;
use crate::raw::RawMappingTable;
use crate::types::{Position, TableEntry};
use crate::utils::{fix_file_url_source, parent_dir, relative_path, resolve_path};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One decoded source map.
///
/// Sources and `sourceRoot` are resolved against the directory of the
/// table's own path, never against the generated file's directory.
#[derive(Debug, Clone)]
pub struct MappingTable {
    raw: RawMappingTable,
    decoded: DecodedMappings,
    /// Where this table is (or will be) persisted
    path: PathBuf,
    /// Path of the generated file this table annotates (diagnostics only)
    artifact: PathBuf,
    /// Absolute path of each declared source, parallel to `raw.sources`
    sources: Vec<PathBuf>,
    /// Child artifacts in declared order
    children: Vec<ArtifactId>,
    /// Child lookup by absolute source path
    child_index: HashMap<PathBuf, ArtifactId>,
}

impl MappingTable {
    /// Create a table and resolve its declared sources.
    ///
    /// Children are registered separately once they have been opened.
    pub fn new(raw: RawMappingTable, decoded: DecodedMappings, artifact: &Path, path: &Path) -> Self {
        let mut table = MappingTable {
            raw,
            decoded,
            path: path.to_path_buf(),
            artifact: artifact.to_path_buf(),
            sources: Vec::new(),
            children: Vec::new(),
            child_index: HashMap::new(),
        };
        table.sources = table
            .raw
            .sources
            .iter()
            .map(|source| table.resolve_source(source))
            .collect();
        table
    }

    pub fn raw(&self) -> &RawMappingTable {
        &self.raw
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Absolute paths of the declared sources, in declared order
    pub fn source_paths(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn children(&self) -> &[ArtifactId] {
        &self.children
    }

    pub fn child(&self, source: &Path) -> Option<ArtifactId> {
        self.child_index.get(source).copied()
    }

    pub(crate) fn register_child(&mut self, source: PathBuf, child: ArtifactId) {
        self.children.push(child);
        self.child_index.insert(source, child);
    }

    pub fn lookup(&self, position: Position) -> Option<TableEntry> {
        self.decoded.lookup(position)
    }

    pub fn generated_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.decoded.generated_positions()
    }

    /// Absolute path of the declared source at `index`
    pub fn declared_source(&self, index: u32) -> Option<&Path> {
        self.sources.get(index as usize).map(PathBuf::as_path)
    }

    /// Absolute path of this table's `sourceRoot` (`.` when unset)
    pub fn absolute_source_root(&self) -> PathBuf {
        let root = self
            .raw
            .source_root
            .as_deref()
            .filter(|root| !root.is_empty())
            .unwrap_or(".");
        self.resolve_relative_path(Path::new(root))
    }

    /// Resolve a path that is relative to this table
    pub fn resolve_relative_path(&self, path: &Path) -> PathBuf {
        resolve_path(parent_dir(&self.path), path)
    }

    /// Express `path` relative to this table's directory
    pub fn relative_path(&self, path: &Path) -> String {
        let dir = parent_dir(&self.path);
        let fixed = fix_file_url_source(&path.to_string_lossy(), dir);
        relative_path(dir, &resolve_path(dir, Path::new(&fixed)))
    }

    /// Absolute path of a declared source identifier
    pub fn resolve_source(&self, source: &str) -> PathBuf {
        let fixed = fix_file_url_source(source, parent_dir(&self.path));
        resolve_path(&self.absolute_source_root(), Path::new(&fixed))
    }

    /// Same mappings and sources with `sourcesContent` replaced
    pub fn with_sources_content(mut self, contents: Vec<Option<String>>) -> Self {
        self.raw.sources_content = Some(contents);
        self
    }

    /// Move the table to `path`.
    ///
    /// Declared sources are rebased onto the new directory so that they keep
    /// naming the same files; the mappings are untouched.
    pub fn set_path(&mut self, path: PathBuf) {
        if parent_dir(&path) != parent_dir(&self.path) {
            let dir = parent_dir(&path);
            self.raw.sources = self
                .sources
                .iter()
                .map(|source| relative_path(dir, source))
                .collect();
            self.raw.source_root = None;
            if self.raw.file.is_some() {
                self.raw.file = Some(relative_path(dir, &self.artifact));
            }
        }
        self.path = path;
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        self.raw.to_json()
    }
}
