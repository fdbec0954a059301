/*
 * types.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Core types for chained position resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A position in generated or original text (0-indexed line, 0-indexed column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: u32,
    /// Column number (0-indexed)
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One decoded entry of a mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// Position in the generated text
    pub generated: Position,
    /// Position in the immediate ancestor
    pub original: Position,
    /// Index into the table's declared sources
    pub source_index: u32,
    /// Symbol name, if the entry carries one
    pub name: Option<String>,
}

/// Result of resolving a generated position through a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedLocation {
    /// Absolute path of the source the position was resolved to
    pub source: PathBuf,
    /// Position in that source
    pub position: Position,
    /// Symbol name reported along the chain
    pub name: Option<String>,
}
