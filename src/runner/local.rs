//! CW-014: Local shell execution.

use super::ExecOutput;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run `script` with `sh` in `dir`, feeding it on stdin.
pub fn exec_local(script: &str, dir: &Path) -> Result<ExecOutput, String> {
    let mut child = Command::new("sh")
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn sh: {}", e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(script.as_bytes())
            .map_err(|e| format!("stdin write error: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_cw014_local_echo() {
        let dir = here();
        let out = exec_local("echo hello", dir.path()).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_cw014_local_exit_code() {
        let dir = here();
        let out = exec_local("exit 42", dir.path()).unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, 42);
    }

    #[test]
    fn test_cw014_local_stderr_captured() {
        let dir = here();
        let out = exec_local("echo broken >&2; exit 3", dir.path()).unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(out.stderr.contains("broken"));
    }

    #[test]
    fn test_cw014_local_working_directory() {
        let dir = here();
        let out = exec_local("echo x > made.txt", dir.path()).unwrap();
        assert!(out.success());
        assert!(dir.path().join("made.txt").exists());
    }

    #[test]
    fn test_cw014_local_signal_killed() {
        let dir = here();
        let out = exec_local("kill -9 $$", dir.path()).unwrap();
        assert_eq!(out.exit_code, -1);
    }
}
