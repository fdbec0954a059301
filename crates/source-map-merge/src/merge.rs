/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Merging source map chains of whole files

use crate::context::ChainContext;
use crate::error::{MergeError, Result};
use crate::options::{MergeOptions, MergeOptionsOverlay};
use crate::utils::absolutize;
use std::path::{Path, PathBuf};

/// A generated file to merge and where its output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub src: PathBuf,
    pub dest: PathBuf,
}

impl FileSpec {
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        FileSpec {
            src: src.into(),
            dest: dest.into(),
        }
    }

    /// Merge `path` and update it in place
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        FileSpec {
            src: path.clone(),
            dest: path,
        }
    }

    /// Build a [`FileSpec`] from a target that lists several sources.
    ///
    /// Only the first source is used; extra sources are reported.
    pub fn from_sources(sources: &[PathBuf], dest: impl Into<PathBuf>) -> Option<Self> {
        let (first, rest) = sources.split_first()?;
        if !rest.is_empty() {
            let all: Vec<String> = sources.iter().map(|s| s.display().to_string()).collect();
            tracing::warn!(
                "Multiple source files specified for a single target: {}",
                all.join(" ")
            );
        }
        Some(FileSpec::new(first.clone(), dest))
    }
}

/// What [`merge_one`] did with a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merged source map was written to `table`
    Written { table: PathBuf },
    /// The merged source map was embedded into `artifact`
    Inlined { artifact: PathBuf },
    /// The file has no source map and was left alone
    Skipped,
}

/// Merge the source map chain of one file.
pub fn merge_one(file: &FileSpec, options: &MergeOptions) -> Result<MergeOutcome> {
    let mut ctx = ChainContext::new();
    let artifact = ctx.open(&file.src, false)?;
    let artifact_path = ctx.artifact(artifact).path().to_path_buf();

    if ctx.artifact(artifact).table().is_none() {
        if options.ignore_missing_source_maps {
            tracing::info!(file = %file.src.display(), "No source map, skipping");
            return Ok(MergeOutcome::Skipped);
        }
        return Err(MergeError::MissingSourceMap {
            path: file.src.clone(),
        });
    }

    // Merge all of the sources together
    let table = ctx.merge(artifact, true)?;
    if options.inline_sources {
        ctx.inline_sources(table);
    }

    let dest = absolutize(&file.dest).map_err(|source| MergeError::Read {
        path: file.dest.clone(),
        source,
    })?;

    if options.inline_source_map {
        if dest != artifact_path {
            if !dest.exists() {
                return Err(MergeError::MissingInlineTarget { dest: file.dest.clone() });
            }
            ctx.set_output_target(artifact, dest.clone());
        }
        // The artifact carries the map, so the map itself is not flushed
        ctx.inline_table(artifact)?;
        tracing::info!(file = %dest.display(), "Inlined merged source map");
        return Ok(MergeOutcome::Inlined { artifact: dest });
    }

    if dest != artifact_path {
        ctx.set_table_path(table, dest);
    }
    if ctx.table(table).path() == artifact_path {
        let with_suffix = append_map_suffix(ctx.table(table).path());
        ctx.set_table_path(table, with_suffix);
    }
    let table_path = ctx.table(table).path().to_path_buf();
    ctx.flush(table)?;

    let reference = ctx.artifact(artifact).relative_path_from(&table_path);
    ctx.set_reference(artifact, &reference)?;
    ctx.persist(artifact)?;

    tracing::info!(file = %file.src.display(), map = %table_path.display(), "Wrote merged source map");
    Ok(MergeOutcome::Written { table: table_path })
}

/// Merge every file in order, stopping at the first error.
///
/// `overlay` is applied on top of the default [`MergeOptions`].
pub fn merge<I>(files: I, overlay: &MergeOptionsOverlay) -> Result<Vec<MergeOutcome>>
where
    I: IntoIterator<Item = FileSpec>,
{
    let options = MergeOptions::default().overlay(overlay);
    files
        .into_iter()
        .map(|file| merge_one(&file, &options))
        .collect()
}

fn append_map_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}
