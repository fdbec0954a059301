//! Merge options

use serde::{Deserialize, Serialize};

/// Options controlling how a merged source map is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeOptions {
    /// Embed original source text into the merged source map
    pub inline_sources: bool,
    /// Embed the merged source map into the generated file
    pub inline_source_map: bool,
    /// Skip inputs without a source map instead of failing
    pub ignore_missing_source_maps: bool,
}

/// A partial set of options; unset fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeOptionsOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_sources: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_source_map: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_missing_source_maps: Option<bool>,
}

impl MergeOptions {
    /// Apply the fields set in `overlay` on top of these options
    pub fn overlay(self, overlay: &MergeOptionsOverlay) -> Self {
        MergeOptions {
            inline_sources: overlay.inline_sources.unwrap_or(self.inline_sources),
            inline_source_map: overlay.inline_source_map.unwrap_or(self.inline_source_map),
            ignore_missing_source_maps: overlay
                .ignore_missing_source_maps
                .unwrap_or(self.ignore_missing_source_maps),
        }
    }
}

impl MergeOptionsOverlay {
    /// Combine two overlays; fields set in `other` win
    pub fn then(self, other: &MergeOptionsOverlay) -> Self {
        MergeOptionsOverlay {
            inline_sources: other.inline_sources.or(self.inline_sources),
            inline_source_map: other.inline_source_map.or(self.inline_source_map),
            ignore_missing_source_maps: other
                .ignore_missing_source_maps
                .or(self.ignore_missing_source_maps),
        }
    }
}
