//! Path helpers: absolute resolution for the walk root and display forms for
//! reported entries.

use std::env;
use std::path::{Component, Path, PathBuf};

use serde::Serializer;

/// Resolve a path to an absolute, normalized path.
///
/// `fs::canonicalize` is preferred when the path exists (symlinks in the root
/// are resolved once, up front). Otherwise the path is joined onto the current
/// directory and `.`/`..` are folded syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

/// Render `path` for operator output.
///
/// With `absolute` the path is returned as-is (walk paths are already absolute).
/// Otherwise it is shown relative to `root`; the root itself renders as `.`.
pub fn display_path(path: &Path, root: &Path, absolute: bool) -> PathBuf {
    if absolute {
        return path.to_path_buf();
    }
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

/// Serialize a path as a string, replacing invalid UTF-8 with U+FFFD.
///
/// For `#[serde(serialize_with = ...)]` on path fields of reports.
pub fn serialize_path_lossy<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
