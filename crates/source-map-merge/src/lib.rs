//! Source map chain merging
//!
//! A generated file is often the product of several transformation stages
//! (TypeScript → JavaScript → minified JavaScript, Sass → CSS → autoprefixed
//! CSS), each emitting its own source map. This crate follows such a chain
//! back to the true original sources and writes a single flattened source
//! map equivalent to the whole chain.
//!
//! # Overview
//!
//! The core types are:
//! - [`GeneratedArtifact`]: A generated file and its `sourceMappingURL` reference
//! - [`MappingTable`]: A decoded source map and its declared sources
//! - [`ChainContext`]: Owns every artifact and table of a chain, resolves
//!   positions through it and flattens tables
//!
//! # Example
//!
//! ```rust,no_run
//! use source_map_merge::{FileSpec, MergeError, MergeOptions, MergeOutcome, merge_one};
//!
//! // Rewrite dist/app.js.map so it maps straight to the original sources
//! let outcome = merge_one(&FileSpec::in_place("dist/app.js"), &MergeOptions::default())?;
//! assert!(matches!(outcome, MergeOutcome::Written { .. }));
//! # Ok::<(), MergeError>(())
//! ```

pub mod artifact;
pub mod codec;
pub mod context;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod options;
pub mod raw;
pub mod table;
pub mod types;
pub mod utils;

// Re-export main types
pub use artifact::{GeneratedArtifact, ReferenceValue, SourceMapReference};
pub use context::{ArtifactId, ChainContext, TableId};
pub use error::{MergeError, Result};
pub use merge::{FileSpec, MergeOutcome, merge, merge_one};
pub use options::{MergeOptions, MergeOptionsOverlay};
pub use raw::RawMappingTable;
pub use table::MappingTable;
pub use types::{MappedLocation, Position, TableEntry};
