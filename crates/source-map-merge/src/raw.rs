//! Serde model of the on-disk source map object

use serde::{Deserialize, Serialize};

/// The JSON envelope of a (version 3) source map.
///
/// `mappings` is kept encoded; decoding is the codec's job. `sections` is
/// only read so that indexed source maps can be rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMappingTable {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
    #[serde(default, skip_serializing)]
    pub sections: Option<serde_json::Value>,
}

impl RawMappingTable {
    /// Whether this is the unsupported indexed ("sections") form
    pub fn has_sections(&self) -> bool {
        self.sections.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
