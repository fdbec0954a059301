/*
 * codec.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Mapping codec backed by the `sourcemap` crate
//!
//! The codec turns a raw source map into enumerable generated→original
//! entries and back. Everything above this module works with [`Position`]
//! and [`TableEntry`] and never sees VLQ.

use crate::error::{MergeError, Result};
use crate::raw::RawMappingTable;
use crate::types::{Position, TableEntry};
use sourcemap::{SourceMap, SourceMapBuilder};
use std::path::{Path, PathBuf};

/// Marker the codec uses for "no source" / "no name" indices
const NO_INDEX: u32 = !0;

/// The decoded mappings of one source map
#[derive(Debug, Clone)]
pub struct DecodedMappings {
    map: SourceMap,
}

/// Parse a source map from JSON bytes.
///
/// Indexed source maps are rejected before the mappings are decoded.
pub fn decode_table(bytes: &[u8], table: &Path) -> Result<(RawMappingTable, DecodedMappings)> {
    let raw: RawMappingTable =
        serde_json::from_slice(bytes).map_err(|source| MergeError::MalformedTable {
            table: table.to_path_buf(),
            source,
        })?;
    if raw.has_sections() {
        return Err(MergeError::SectionsUnsupported {
            table: table.to_path_buf(),
        });
    }
    let map = SourceMap::from_slice(bytes).map_err(|source| MergeError::Codec {
        table: table.to_path_buf(),
        source,
    })?;
    Ok((raw, DecodedMappings { map }))
}

impl DecodedMappings {
    /// Find the entry covering a generated position.
    ///
    /// The closest entry at or before `position` on the same generated line
    /// wins. Entries without an original position count as gaps.
    pub fn lookup(&self, position: Position) -> Option<TableEntry> {
        let token = self.map.lookup_token(position.line, position.column)?;
        if token.get_dst_line() != position.line || token.get_src_id() == NO_INDEX {
            return None;
        }
        Some(TableEntry {
            generated: Position::new(token.get_dst_line(), token.get_dst_col()),
            original: Position::new(token.get_src_line(), token.get_src_col()),
            source_index: token.get_src_id(),
            name: token.get_name().map(str::to_string),
        })
    }

    /// Generated positions of every entry, in generated order
    pub fn generated_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.map
            .tokens()
            .map(|token| Position::new(token.get_dst_line(), token.get_dst_col()))
    }

    pub fn entry_count(&self) -> usize {
        self.map.get_token_count() as usize
    }
}

/// Builds a new source map from flattened entries
pub struct TableBuilder {
    builder: SourceMapBuilder,
    table: PathBuf,
}

impl TableBuilder {
    /// Start a table that will live at `table`, with an optional `file` hint
    pub fn new(table: &Path, file: Option<&str>) -> Self {
        TableBuilder {
            builder: SourceMapBuilder::new(file),
            table: table.to_path_buf(),
        }
    }

    pub fn add(&mut self, generated: Position, original: Position, source: &str, name: Option<&str>) {
        self.builder.add(
            generated.line,
            generated.column,
            original.line,
            original.column,
            Some(source),
            name,
            false,
        );
    }

    /// Encode the collected entries
    pub fn finish(self) -> Result<(RawMappingTable, DecodedMappings)> {
        let map = self.builder.into_sourcemap();
        let mut bytes = Vec::new();
        map.to_writer(&mut bytes).map_err(|source| MergeError::Codec {
            table: self.table.clone(),
            source,
        })?;
        let raw: RawMappingTable =
            serde_json::from_slice(&bytes).map_err(|e| MergeError::Encode {
                table: self.table.clone(),
                message: e.to_string(),
            })?;
        Ok((raw, DecodedMappings { map }))
    }
}
