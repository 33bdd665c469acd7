//! CW-003: Config merging and path resolution.
//!
//! Target config keys override same-named global keys; keys set only
//! globally fall through. Relative output paths and command directories
//! resolve against the run's base directory.

use super::types::{Command, ConfigMap};
use std::path::{Component, Path, PathBuf};

/// Merge global and target config. Global key order first, then target-only keys.
pub fn merge_config(global: &ConfigMap, target: &ConfigMap) -> ConfigMap {
    let mut merged = global.clone();
    for (key, value) in target {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Resolve a (possibly relative) path against the base directory.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Working directory of a command.
pub fn command_dir(base_dir: &Path, command: &Command) -> PathBuf {
    match &command.dir {
        Some(dir) => resolve_path(base_dir, dir),
        None => base_dir.to_path_buf(),
    }
}

/// Lexically normalize a path (`.` dropped, `..` folded). No filesystem access.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
