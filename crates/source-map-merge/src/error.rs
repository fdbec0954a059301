//! Error types for source map merging.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving or flattening a source map chain
#[derive(Debug, Error)]
pub enum MergeError {
    /// The input file carries no `sourceMappingURL` reference
    #[error(
        "File {} does not have any source maps.\nIf this is not an error, set \"ignoreMissingSourceMaps\" to true.",
        .path.display()
    )]
    MissingSourceMap { path: PathBuf },

    /// A generated file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An external source map file could not be read
    #[error("Failed to read source map for {} at {}: {source}", .artifact.display(), .table.display())]
    UnreadableTable {
        artifact: PathBuf,
        table: PathBuf,
        source: std::io::Error,
    },

    /// A source map is not valid JSON or lacks required fields
    #[error("Failed to parse source map at {}: {source}", .table.display())]
    MalformedTable {
        table: PathBuf,
        source: serde_json::Error,
    },

    /// An embedded `data:` source map is not valid base64
    #[error("Failed to decode embedded source map in {}: {source}", .artifact.display())]
    InvalidEmbeddedTable {
        artifact: PathBuf,
        source: base64::DecodeError,
    },

    /// The mappings of a source map could not be decoded
    #[error("Failed to decode mappings of source map at {}: {source}", .table.display())]
    Codec {
        table: PathBuf,
        source: sourcemap::Error,
    },

    /// The source map uses the indexed ("sections") form
    #[error("Source map at {} contains the unsupported \"sections\" property", .table.display())]
    SectionsUnsupported { table: PathBuf },

    /// No mapping exists for a requested generated position
    #[error("Could not find original location of {}:{line}:{column}", .artifact.display())]
    PositionNotFound {
        artifact: PathBuf,
        line: u32,
        column: u32,
    },

    /// A mapping names a source that has no registered artifact
    #[error(
        "Could not find original location of {}:{line}:{column}: source {} is not declared",
        .artifact.display(),
        .source_path.display()
    )]
    UnregisteredSource {
        artifact: PathBuf,
        source_path: PathBuf,
        line: u32,
        column: u32,
    },

    /// The chain refers back to an artifact that is already being resolved
    #[error("Source map chain loops back to {}", .artifact.display())]
    CyclicChain { artifact: PathBuf },

    /// `inlineSourceMap` was requested with a destination that does not exist
    #[error("\"inlineSourceMap\" specified, but destination file {} does not exist!", .dest.display())]
    MissingInlineTarget { dest: PathBuf },

    /// A merged source map could not be serialized
    #[error("Failed to encode source map for {}: {message}", .table.display())]
    Encode { table: PathBuf, message: String },

    /// Output could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MergeError>;
