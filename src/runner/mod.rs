//! CW-014: Post-generation command execution.

pub mod local;

use crate::core::resolver::normalize_path;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Output from running a command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run one `runAfter` command in `dir`.
pub fn run_command(command: &str, dir: &Path) -> Result<ExecOutput, String> {
    if !dir.is_dir() {
        return Err(format!("working directory {} does not exist", dir.display()));
    }
    tracing::debug!(command, dir = %dir.display(), "running command");
    local::exec_local(command, dir)
}

/// One mutex per working directory.
///
/// Commands sharing a directory (formatters, `git add`) run one at a time
/// even when targets are generated in parallel.
#[derive(Debug, Default)]
pub struct DirLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DirLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock for `dir`. Spellings of the same directory (`web/../web`, a
    /// symlink) share one lock.
    pub fn for_dir(&self, dir: &Path) -> Arc<Mutex<()>> {
        let key = std::fs::canonicalize(dir).unwrap_or_else(|_| normalize_path(dir));
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key).or_default())
    }
}
