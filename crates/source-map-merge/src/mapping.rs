//! Position mapping through transformation chains

use crate::codec::TableBuilder;
use crate::context::{ArtifactId, ChainContext, TableId};
use crate::error::{MergeError, Result};
use crate::table::MappingTable;
use crate::types::{MappedLocation, Position};

impl ChainContext {
    /// Map a generated position of an artifact back to its original source.
    ///
    /// A file without a source map is an original source, so its positions
    /// map to themselves. Returns `Ok(None)` for a gap when `tolerate_gaps`.
    pub fn resolve_position(
        &self,
        artifact: ArtifactId,
        position: Position,
        tolerate_gaps: bool,
    ) -> Result<Option<MappedLocation>> {
        let mut visiting = Vec::new();
        self.resolve_in_artifact(artifact, position, tolerate_gaps, &mut visiting)
    }

    fn resolve_in_artifact(
        &self,
        id: ArtifactId,
        position: Position,
        tolerate_gaps: bool,
        visiting: &mut Vec<ArtifactId>,
    ) -> Result<Option<MappedLocation>> {
        let artifact = self.artifact(id);
        let Some(table) = artifact.table() else {
            return Ok(Some(MappedLocation {
                source: artifact.path().to_path_buf(),
                position,
                name: None,
            }));
        };

        if visiting.contains(&id) {
            return Err(MergeError::CyclicChain {
                artifact: artifact.path().to_path_buf(),
            });
        }
        visiting.push(id);
        let result = self.resolve_in_table(table, position, tolerate_gaps, visiting);
        visiting.pop();
        result
    }

    fn resolve_in_table(
        &self,
        id: TableId,
        position: Position,
        tolerate_gaps: bool,
        visiting: &mut Vec<ArtifactId>,
    ) -> Result<Option<MappedLocation>> {
        let table = self.table(id);
        let not_found = || MergeError::PositionNotFound {
            artifact: table.artifact_path().to_path_buf(),
            line: position.line,
            column: position.column,
        };

        let Some(entry) = table.lookup(position) else {
            return if tolerate_gaps { Ok(None) } else { Err(not_found()) };
        };
        let Some(source) = table.declared_source(entry.source_index) else {
            return if tolerate_gaps { Ok(None) } else { Err(not_found()) };
        };

        let location = MappedLocation {
            source: source.to_path_buf(),
            position: entry.original,
            name: entry.name,
        };
        let Some(child) = table.child(source) else {
            if tolerate_gaps {
                return Ok(Some(location));
            }
            return Err(MergeError::UnregisteredSource {
                artifact: table.artifact_path().to_path_buf(),
                source_path: location.source,
                line: position.line,
                column: position.column,
            });
        };

        let resolved = self.resolve_in_artifact(child, location.position, tolerate_gaps, visiting)?;
        Ok(resolved.map(|mut resolved| {
            // Keep the name from this hop when the rest of the chain has none
            if resolved.name.is_none() {
                resolved.name = location.name;
            }
            resolved
        }))
    }

    /// Flatten an artifact's table so it maps straight to original sources.
    ///
    /// Every entry is resolved through the chain. Unresolvable entries are
    /// dropped when `tolerate_gaps`, otherwise the merge fails. The table is
    /// then rebuilt from the flattened entries, with sources relative to the
    /// table's own path.
    pub fn merge(&mut self, artifact: ArtifactId, tolerate_gaps: bool) -> Result<TableId> {
        let Some(id) = self.artifact(artifact).table() else {
            return Err(MergeError::MissingSourceMap {
                path: self.artifact(artifact).path().to_path_buf(),
            });
        };
        let table = self.table(id);
        let file = file_hint(table);
        let mut builder = TableBuilder::new(table.path(), Some(file.as_str()));

        let mut kept = 0usize;
        let mut dropped = 0usize;
        let mut visiting = vec![artifact];
        for generated in table.generated_positions() {
            match self.resolve_in_table(id, generated, tolerate_gaps, &mut visiting)? {
                Some(original) => {
                    let source = table.relative_path(&original.source);
                    builder.add(generated, original.position, &source, original.name.as_deref());
                    kept += 1;
                }
                None => dropped += 1,
            }
        }
        tracing::debug!(
            table = %table.path().display(),
            kept,
            dropped,
            "Flattened source map"
        );

        let (raw, decoded) = builder.finish()?;
        let merged = MappingTable::new(raw, decoded, table.artifact_path(), table.path());
        self.install_table(artifact, merged)
    }
}

/// The `file` field of a flattened table: its artifact, relative to the table
fn file_hint(table: &MappingTable) -> String {
    table.relative_path(table.artifact_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::embedded_reference;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_json(path: &Path, value: serde_json::Value) {
        fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    /// out.js -> mid.js -> app.ts, all on line 0
    ///
    /// out.js col 0 -> mid.js 0:4, out.js col 6 -> mid.js 0:10
    /// mid.js col 0 -> app.ts 0:0 "start", mid.js col 4 -> app.ts 0:2, mid.js col 10 -> app.ts 0:20
    fn three_stage_chain(dir: &Path) {
        fs::write(dir.join("app.ts"), "original\n").unwrap();
        fs::write(dir.join("mid.js"), "mid;\n//# sourceMappingURL=mid.js.map\n").unwrap();
        write_json(
            &dir.join("mid.js.map"),
            json!({
                "version": 3,
                "sources": ["app.ts"],
                "names": ["start"],
                "mappings": "AAAAA,IAAE,MAAkB"
            }),
        );
        fs::write(dir.join("out.js"), "out;\n//# sourceMappingURL=out.js.map\n").unwrap();
        write_json(
            &dir.join("out.js.map"),
            json!({
                "version": 3,
                "sources": ["mid.js"],
                "names": [],
                "mappings": "AAAI,MAAM"
            }),
        );
    }

    #[test]
    fn test_leaf_maps_to_itself() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.ts");
        fs::write(&path, "x").unwrap();

        let mut ctx = ChainContext::new();
        let id = ctx.open(&path, false).unwrap();
        let mapped = ctx.resolve_position(id, Position::new(3, 7), false).unwrap().unwrap();

        assert_eq!(mapped.source, path);
        assert_eq!(mapped.position, Position::new(3, 7));
    }

    #[test]
    fn test_resolve_through_chain() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        three_stage_chain(dir);

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();
        let mid = ctx.find(&dir.join("mid.js")).unwrap();

        // Transitivity: out -> mid, then mid -> app equals out -> app
        let direct = ctx.resolve_position(out, Position::new(0, 6), false).unwrap().unwrap();
        let intermediate = ctx.table_of(out).unwrap().lookup(Position::new(0, 6)).unwrap();
        assert_eq!(intermediate.original, Position::new(0, 10));
        let stepwise = ctx
            .resolve_position(mid, intermediate.original, false)
            .unwrap()
            .unwrap();

        assert_eq!(direct, stepwise);
        assert_eq!(direct.source, dir.join("app.ts"));
        assert_eq!(direct.position, Position::new(0, 20));
    }

    #[test]
    fn test_names_come_from_the_chain() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        three_stage_chain(dir);

        let mut ctx = ChainContext::new();
        let mid = ctx.open(&dir.join("mid.js"), false).unwrap();
        let mapped = ctx.resolve_position(mid, Position::new(0, 0), false).unwrap().unwrap();

        assert_eq!(mapped.name.as_deref(), Some("start"));
    }

    #[test]
    fn test_gap_handling() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        three_stage_chain(dir);

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();

        let err = ctx.resolve_position(out, Position::new(5, 0), false).unwrap_err();
        assert!(matches!(
            err,
            MergeError::PositionNotFound { line: 5, column: 0, .. }
        ));
        assert!(ctx.resolve_position(out, Position::new(5, 0), true).unwrap().is_none());
    }

    #[test]
    fn test_cycle_is_detected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("a.js"), "a;\n//# sourceMappingURL=a.js.map").unwrap();
        fs::write(dir.join("b.js"), "b;\n//# sourceMappingURL=b.js.map").unwrap();
        write_json(
            &dir.join("a.js.map"),
            json!({ "version": 3, "sources": ["b.js"], "names": [], "mappings": "AAAA" }),
        );
        write_json(
            &dir.join("b.js.map"),
            json!({ "version": 3, "sources": ["a.js"], "names": [], "mappings": "AAAA" }),
        );

        let mut ctx = ChainContext::new();
        let a = ctx.open(&dir.join("a.js"), false).unwrap();
        let err = ctx.resolve_position(a, Position::new(0, 0), true).unwrap_err();
        assert!(matches!(err, MergeError::CyclicChain { .. }));
    }

    #[test]
    fn test_merge_flattens_chain() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        three_stage_chain(dir);

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();
        let id = ctx.merge(out, true).unwrap();
        let table = ctx.table(id);

        assert_eq!(table.raw().sources, vec!["app.ts".to_string()]);
        assert_eq!(table.raw().file.as_deref(), Some("out.js"));
        assert_eq!(table.children(), &[ctx.find(&dir.join("app.ts")).unwrap()]);

        let first = table.lookup(Position::new(0, 0)).unwrap();
        assert_eq!(first.original, Position::new(0, 2));
        let second = table.lookup(Position::new(0, 6)).unwrap();
        assert_eq!(second.original, Position::new(0, 20));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        three_stage_chain(dir);

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();
        let id = ctx.merge(out, true).unwrap();
        let once = ctx.table(id).raw().clone();
        ctx.merge(out, true).unwrap();

        assert_eq!(ctx.table(id).raw(), &once);
    }

    #[test]
    fn test_single_stage_merge_keeps_coordinates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("app.ts"), "original\n").unwrap();
        let map = json!({
            "version": 3,
            "sources": ["app.ts"],
            "names": [],
            "mappings": "AAAA,IAAE;AACA"
        });
        fs::write(
            dir.join("out.js"),
            format!("a;\nb;\n//# sourceMappingURL={}", embedded_reference(&map.to_string())),
        )
        .unwrap();

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();
        let before: Vec<_> = {
            let table = ctx.table_of(out).unwrap();
            table
                .generated_positions()
                .map(|p| table.lookup(p).unwrap().original)
                .collect()
        };
        let id = ctx.merge(out, false).unwrap();
        let table = ctx.table(id);
        let after: Vec<_> = table
            .generated_positions()
            .map(|p| table.lookup(p).unwrap().original)
            .collect();

        assert_eq!(before, after);
    }

    #[test]
    fn test_merge_without_tolerance_fails_on_gap() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("out.js"), "x;\n//# sourceMappingURL=out.js.map").unwrap();
        // Second segment has no original position
        write_json(
            &dir.join("out.js.map"),
            json!({ "version": 3, "sources": ["app.ts"], "names": [], "mappings": "AAAA,C" }),
        );

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();
        assert!(ctx.merge(out, false).is_err());

        let id = ctx.merge(out, true).unwrap();
        assert_eq!(ctx.table(id).generated_positions().count(), 1);
    }

    #[test]
    fn test_table_without_sources_has_only_gaps() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("out.js"), "x;\n//# sourceMappingURL=out.js.map").unwrap();
        write_json(
            &dir.join("out.js.map"),
            json!({ "version": 3, "sources": [], "names": [], "mappings": "A,C" }),
        );

        let mut ctx = ChainContext::new();
        let out = ctx.open(&dir.join("out.js"), false).unwrap();
        assert!(ctx.table_of(out).unwrap().children().is_empty());
        assert!(ctx.resolve_position(out, Position::new(0, 0), true).unwrap().is_none());
        assert!(matches!(
            ctx.resolve_position(out, Position::new(0, 1), false).unwrap_err(),
            MergeError::PositionNotFound { line: 0, column: 1, .. }
        ));

        let id = ctx.merge(out, true).unwrap();
        assert_eq!(ctx.table(id).generated_positions().count(), 0);
        assert!(ctx.table(id).source_paths().is_empty());
    }
}
