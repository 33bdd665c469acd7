//! CW-013: Atomic output writes.
//!
//! Content goes to a sibling temp file which is then renamed over the
//! destination, so readers see either the old file or the new one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `path`, creating parent directories.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), String> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;

    let tmp_path = temp_path(&parent, path);
    let result = write_and_rename(&tmp_path, path, contents);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_rename(tmp_path: &Path, path: &Path, contents: &str) -> Result<(), String> {
    let mut file = std::fs::File::create(tmp_path)
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    file.sync_all()
        .map_err(|e| format!("cannot sync {}: {}", tmp_path.display(), e))?;
    drop(file);
    std::fs::rename(tmp_path, path).map_err(|e| {
        format!(
            "cannot rename {} → {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })
}

/// `.{name}.{pid}.{n}.tmp` next to the destination.
fn temp_path(parent: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
}
