//! CW-017: Append-only JSONL run log at `.codeweft/events.jsonl`.

use crate::core::types::{GenerationEvent, TimestampedEvent};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory holding run artifacts, relative to the base directory.
pub const STATE_DIR: &str = ".codeweft";

/// UTC timestamp, `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_iso8601() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_iso8601(secs)
}

fn format_iso8601(secs: u64) -> String {
    let days = secs / 86400;
    let time_secs = secs % 86400;
    let (hours, minutes, seconds) = (time_secs / 3600, (time_secs % 3600) / 60, time_secs % 60);

    let mut year = 1970i64;
    let mut remaining = days as i64;
    loop {
        let year_days = if is_leap(year) { 366 } else { 365 };
        if remaining < year_days {
            break;
        }
        remaining -= year_days;
        year += 1;
    }
    let feb = if is_leap(year) { 29 } else { 28 };
    let month_days = [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 12;
    for (i, &len) in month_days.iter().enumerate() {
        if remaining < len {
            month = i + 1;
            break;
        }
        remaining -= len;
    }

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        remaining + 1,
        hours,
        minutes,
        seconds
    )
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

pub fn event_log_path(base_dir: &Path) -> PathBuf {
    base_dir.join(STATE_DIR).join("events.jsonl")
}

/// Append one event. Each line goes out in a single write so parallel
/// targets never interleave partial lines.
pub fn append_event(base_dir: &Path, event: GenerationEvent) -> Result<(), String> {
    let path = event_log_path(base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("cannot create state dir: {}", e))?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let mut line = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;
    line.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| format!("write error: {}", e))
}

/// Event sink for one run; a disabled log swallows events.
pub struct RunLog {
    base_dir: Option<PathBuf>,
    run_id: String,
}

impl RunLog {
    pub fn new(base_dir: &Path, enabled: bool) -> Self {
        Self {
            base_dir: enabled.then(|| base_dir.to_path_buf()),
            run_id: generate_run_id(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn record(&self, event: GenerationEvent) {
        if let Some(dir) = &self.base_dir {
            if let Err(e) = append_event(dir, event) {
                tracing::warn!(error = %e, "event log write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cw017_now_iso8601_shape() {
        let ts = now_iso8601();
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 20);
    }

    #[test]
    fn test_cw017_format_known_instants() {
        assert_eq!(format_iso8601(0), "1970-01-01T00:00:00Z");
        // 2024-02-29T12:34:56Z
        assert_eq!(format_iso8601(1_709_210_096), "2024-02-29T12:34:56Z");
        // 2023-12-31T23:59:59Z
        assert_eq!(format_iso8601(1_704_067_199), "2023-12-31T23:59:59Z");
    }

    #[test]
    fn test_cw017_is_leap() {
        assert!(is_leap(2000));
        assert!(!is_leap(1900));
        assert!(is_leap(2024));
        assert!(!is_leap(2026));
    }

    #[test]
    fn test_cw017_run_id() {
        let id = generate_run_id();
        assert!(id.starts_with("r-"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn test_cw017_event_log_path() {
        let p = event_log_path(Path::new("/work"));
        assert_eq!(p, PathBuf::from("/work/.codeweft/events.jsonl"));
    }

    #[test]
    fn test_cw017_append_multiple() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            append_event(
                dir.path(),
                GenerationEvent::TargetSkipped {
                    run_id: "r-abc".into(),
                    target: format!("out/{}.md", i),
                },
            )
            .unwrap();
        }
        let content = std::fs::read_to_string(event_log_path(dir.path())).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "target_skipped");
        assert_eq!(first["target"], "out/0.md");
        assert!(first["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_cw017_disabled_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path(), false);
        log.record(GenerationEvent::TargetSkipped {
            run_id: log.run_id().to_string(),
            target: "x".into(),
        });
        assert!(!event_log_path(dir.path()).exists());
    }
}
