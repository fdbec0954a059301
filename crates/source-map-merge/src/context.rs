//! Arena of generated files and source maps for one merge

use crate::artifact::{GeneratedArtifact, ReferenceValue, decode_embedded, embedded_reference};
use crate::codec::decode_table;
use crate::error::{MergeError, Result};
use crate::table::MappingTable;
use crate::utils::absolutize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Identifier of a generated file within a [`ChainContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(pub usize);

/// Identifier of a source map slot within a [`ChainContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub usize);

/// Owns every artifact and table reached while walking a chain.
///
/// Artifacts are keyed by absolute path, so a file declared by several
/// tables is read and parsed once. Tables live in slots that are replaced
/// wholesale whenever a table is rebuilt.
#[derive(Debug, Default)]
pub struct ChainContext {
    artifacts: Vec<GeneratedArtifact>,
    tables: Vec<MappingTable>,
    by_path: HashMap<PathBuf, ArtifactId>,
}

impl ChainContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact(&self, id: ArtifactId) -> &GeneratedArtifact {
        &self.artifacts[id.0]
    }

    pub fn table(&self, id: TableId) -> &MappingTable {
        &self.tables[id.0]
    }

    /// The table owned by an artifact, if it has one
    pub fn table_of(&self, id: ArtifactId) -> Option<&MappingTable> {
        self.artifact(id).table().map(|table| self.table(table))
    }

    pub fn find(&self, path: &Path) -> Option<ArtifactId> {
        self.by_path.get(path).copied()
    }

    /// Open a generated file and, recursively, the chain behind it.
    ///
    /// Returns the existing artifact if `path` was opened before.
    pub fn open(&mut self, path: &Path, tolerate_missing: bool) -> Result<ArtifactId> {
        let path = absolutize(path).map_err(|source| MergeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(id) = self.find(&path) {
            return Ok(id);
        }

        let artifact = GeneratedArtifact::read(&path, tolerate_missing)?;
        if !artifact.exists() {
            tracing::warn!(path = %path.display(), "Declared source does not exist");
        }
        let reference = artifact.reference().map(|r| r.value.clone());

        let id = ArtifactId(self.artifacts.len());
        self.artifacts.push(artifact);
        self.by_path.insert(path.clone(), id);
        tracing::debug!(path = %path.display(), has_reference = reference.is_some(), "Opened artifact");

        if let Some(value) = reference {
            self.load_reference(id, &value)?;
        }
        Ok(id)
    }

    /// Build the table a reference value points to and install it on `id`
    fn load_reference(&mut self, id: ArtifactId, value: &str) -> Result<TableId> {
        let artifact_path = self.artifact(id).path().to_path_buf();
        let (bytes, table_path) = match ReferenceValue::classify(value) {
            ReferenceValue::Embedded(payload) => {
                (decode_embedded(&artifact_path, &payload)?, artifact_path.clone())
            }
            ReferenceValue::External(relative) => {
                let table_path = self.artifact(id).resolve_reference(&relative);
                let bytes =
                    std::fs::read(&table_path).map_err(|source| MergeError::UnreadableTable {
                        artifact: artifact_path.clone(),
                        table: table_path.clone(),
                        source,
                    })?;
                (bytes, table_path)
            }
        };

        let (raw, decoded) = decode_table(&bytes, &table_path)?;
        let table = MappingTable::new(raw, decoded, &artifact_path, &table_path);
        tracing::debug!(
            table = %table_path.display(),
            sources = table.source_paths().len(),
            "Loaded source map"
        );
        self.install_table(id, table)
    }

    /// Open the children of `table` and put it in `owner`'s slot.
    ///
    /// The artifact's previous table, if any, is replaced.
    pub(crate) fn install_table(&mut self, owner: ArtifactId, mut table: MappingTable) -> Result<TableId> {
        for source in table.source_paths().to_vec() {
            if table.child(&source).is_some() {
                continue;
            }
            let child = self.open(&source, true)?;
            table.register_child(source, child);
        }

        let id = match self.artifact(owner).table() {
            Some(id) => {
                self.tables[id.0] = table;
                id
            }
            None => {
                let id = TableId(self.tables.len());
                self.tables.push(table);
                self.artifacts[owner.0].table = Some(id);
                id
            }
        };
        Ok(id)
    }

    /// Point an artifact's reference at `value` and reload its table
    pub fn set_reference(&mut self, id: ArtifactId, value: &str) -> Result<TableId> {
        self.artifacts[id.0].rewrite_reference(value);
        self.load_reference(id, value)
    }

    /// Write the artifact's current content to its output target
    pub fn persist(&self, id: ArtifactId) -> Result<()> {
        let artifact = self.artifact(id);
        tracing::debug!(path = %artifact.target().display(), "Writing generated file");
        artifact.persist()
    }

    /// Write the artifact's content to `target` instead of its own path
    pub fn set_output_target(&mut self, id: ArtifactId, target: PathBuf) {
        self.artifacts[id.0].set_target(target);
    }

    /// Embed the artifact's table as a base64 `data:` reference and persist.
    ///
    /// Sources are rebased onto the file that will carry the table.
    pub fn inline_table(&mut self, id: ArtifactId) -> Result<()> {
        let Some(table) = self.table_of(id) else {
            return Err(MergeError::MissingSourceMap {
                path: self.artifact(id).path().to_path_buf(),
            });
        };
        let mut table = table.clone();
        table.set_path(self.artifact(id).target().to_path_buf());
        let json = table.to_json().map_err(|e| MergeError::Encode {
            table: table.path().to_path_buf(),
            message: e.to_string(),
        })?;
        self.set_reference(id, &embedded_reference(&json))?;
        self.persist(id)
    }

    /// Capture the content of every declared source into `sourcesContent`.
    ///
    /// Sources missing on disk are recorded as `null`.
    pub fn inline_sources(&mut self, id: TableId) {
        let table = self.table(id);
        let contents = table
            .source_paths()
            .iter()
            .map(|source| {
                let artifact = self.artifact(table.child(source)?);
                artifact.exists().then(|| artifact.content().to_string())
            })
            .collect();
        let table = self.tables[id.0].clone().with_sources_content(contents);
        self.tables[id.0] = table;
    }

    /// Change where a table will be persisted
    pub fn set_table_path(&mut self, id: TableId, path: PathBuf) {
        self.tables[id.0].set_path(path);
    }

    /// Persist a table.
    ///
    /// A table whose path is its artifact's own path is embedded into that
    /// artifact; otherwise the JSON is written to the table path.
    pub fn flush(&mut self, id: TableId) -> Result<()> {
        let table = self.table(id);
        if table.path() == table.artifact_path() {
            let owner = self.find(table.artifact_path()).ok_or_else(|| {
                MergeError::MissingSourceMap {
                    path: table.artifact_path().to_path_buf(),
                }
            })?;
            return self.inline_table(owner);
        }

        let json = table.to_json().map_err(|e| MergeError::Encode {
            table: table.path().to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %table.path().display(), "Writing source map");
        std::fs::write(table.path(), json).map_err(|source| MergeError::Write {
            path: table.path().to_path_buf(),
            source,
        })
    }
}
