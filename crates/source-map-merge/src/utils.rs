//! Path algebra for resolving declared sources
//!
//! All helpers here are lexical: they never touch the filesystem, so they
//! behave the same for sources that do not exist on disk.

use std::path::{Component, Path, PathBuf};

/// Marker of the absolute `file:` URLs some Sass compilers write into `sources`
const FILE_PROTOCOL_PREFIX: &str = "file:/";

/// Normalize path components (remove `.` and resolve `..`)
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

/// Resolve `path` against the directory `base`, normalizing the result
///
/// Absolute paths are returned normalized and otherwise unchanged.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Make `path` absolute against the current working directory
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(resolve_path(&std::env::current_dir()?, path))
    }
}

/// The directory containing `path` (`.` if it has none)
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Compute a relative path from the directory `from` to `to` with `..` components.
///
/// Both paths are normalized first. The result always uses `/` separators,
/// since it ends up in source map JSON or a `sourceMappingURL` comment.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from = normalize_path(from);
    let to = normalize_path(to);
    let to_components: Vec<_> = to.components().collect();
    let from_components: Vec<_> = from
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    // Find common prefix length
    let common_len = to_components
        .iter()
        .zip(from_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common_len..from_components.len() {
        parts.push("..".to_string());
    }
    for component in &to_components[common_len..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Rewrite an absolute `file:` URL source into a path relative to `table_dir`.
///
/// dart-sass writes `file:///abs/path.scss` entries into `sources`. Those are
/// turned into plain relative paths like every other source. Values without
/// the protocol are returned unchanged.
pub fn fix_file_url_source(source: &str, table_dir: &Path) -> String {
    match source.find(FILE_PROTOCOL_PREFIX) {
        Some(start) => {
            let rest = &source[start + FILE_PROTOCOL_PREFIX.len()..];
            let absolute = format!("/{}", rest.trim_start_matches('/'));
            relative_path(table_dir, Path::new(&absolute))
        }
        None => source.to_string(),
    }
}
