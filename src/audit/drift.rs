//! CW-018: Drift detection. Compares generated output with files on disk.
//!
//! Targets are rendered in memory and hashed; nothing is written and no
//! command runs.

use super::hasher;
use crate::core::cancel::CancellationSignal;
use crate::core::executor::render_target;
use crate::core::model::Namespace;
use crate::core::planner::{selected, should_skip};
use crate::core::resolver::resolve_path;
use crate::core::types::{DriftFinding, DriftStatus, GenConfig, Target};
use crate::error::{TargetError, TargetFailure};
use crate::loader::VisitorSource;
use std::path::Path;

/// Inputs for a drift check.
pub struct CheckOptions<'a> {
    pub config: &'a GenConfig,
    pub namespace: &'a Namespace,
    pub base_dir: &'a Path,
    pub source: &'a dyn VisitorSource,
    pub cancel: &'a CancellationSignal,
    pub target_filter: Option<&'a str>,
}

/// Check every selected target, in declaration order.
pub fn check(opts: &CheckOptions<'_>) -> Vec<DriftFinding> {
    selected(opts.config, opts.target_filter)
        .map(|(path, target)| DriftFinding {
            target: path.clone(),
            status: check_target(opts, path, target).map_err(|error| TargetFailure {
                target: path.clone(),
                error,
            }),
        })
        .collect()
}

fn check_target(
    opts: &CheckOptions<'_>,
    path: &str,
    target: &Target,
) -> Result<DriftStatus, TargetError> {
    if opts.cancel.is_cancelled() {
        return Err(TargetError::Cancelled { stage: "generation" });
    }
    let dest = resolve_path(opts.base_dir, path);
    if should_skip(target, &dest) {
        return Ok(DriftStatus::Skipped);
    }

    let output = render_target(opts.config, opts.namespace, opts.source, path, target)?;
    if !dest.exists() {
        return Ok(DriftStatus::Missing);
    }
    let expected = hasher::hash_string(&output);
    let actual = hasher::hash_file(&dest).map_err(|message| TargetError::FileWrite {
        path: dest.clone(),
        message,
    })?;
    if expected == actual {
        Ok(DriftStatus::Fresh)
    } else {
        tracing::info!(output = path, %expected, %actual, "stale");
        Ok(DriftStatus::Stale { expected, actual })
    }
}

/// Number of findings that are stale, missing or failed.
pub fn count_drifted(findings: &[DriftFinding]) -> usize {
    findings
        .iter()
        .filter(|f| !matches!(f.status, Ok(DriftStatus::Fresh) | Ok(DriftStatus::Skipped)))
        .count()
}
