//! merge-source-maps - flatten source map chains of generated files in place

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use source_map_merge::{FileSpec, MergeOptionsOverlay, MergeOutcome, merge};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Merge a chain of source maps into a single source map
#[derive(Parser, Debug)]
#[command(name = "merge-source-maps")]
#[command(version, about = "Merges chains of source maps into a single source map", long_about = None)]
struct Args {
    /// JavaScript or CSS files with source maps (updated in place)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Inline original source code into each source map
    #[arg(long)]
    inline_sources: bool,

    /// Inline the source map into the generated file
    #[arg(long)]
    inline_source_map: bool,

    /// Ignore input files that are missing source maps
    #[arg(long)]
    ignore_missing_source_maps: bool,

    /// JSON file with default options (`inlineSources`, `inlineSourceMap`, `ignoreMissingSourceMaps`)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    /// Options set on the command line; unset flags defer to the config file
    fn flag_overlay(&self) -> MergeOptionsOverlay {
        MergeOptionsOverlay {
            inline_sources: self.inline_sources.then_some(true),
            inline_source_map: self.inline_source_map.then_some(true),
            ignore_missing_source_maps: self.ignore_missing_source_maps.then_some(true),
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merge_source_maps=info,source_map_merge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    if args.files.is_empty() {
        Args::command().print_help()?;
        return Ok(());
    }

    let file_overlay = match &args.config {
        Some(path) => read_config(path)?,
        None => MergeOptionsOverlay::default(),
    };
    let overlay = file_overlay.then(&args.flag_overlay());

    let files = args.files.iter().map(FileSpec::in_place);
    let outcomes = merge(files, &overlay).context("Failed to merge source maps")?;

    let merged = outcomes
        .iter()
        .filter(|outcome| !matches!(outcome, MergeOutcome::Skipped))
        .count();
    tracing::info!(merged, skipped = outcomes.len() - merged, "Done");
    Ok(())
}

fn read_config(path: &Path) -> Result<MergeOptionsOverlay> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
