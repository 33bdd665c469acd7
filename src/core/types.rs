//! CW-002: Configuration types, per-target outcomes and run events.
//!
//! Defines the YAML schema of `codeweft.yaml`. Map-valued sections use
//! `IndexMap` so declaration order is processing order.

use crate::error::TargetFailure;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor as SerdeVisitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque key/value bag handed to visitors.
pub type ConfigMap = IndexMap<String, serde_yaml_ng::Value>;

// ============================================================================
// Top-level codeweft.yaml
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenConfig {
    /// Path of the schema document
    pub schema: String,

    /// Global visitor configuration
    #[serde(default)]
    pub config: ConfigMap,

    /// Output path → generation recipe (order-preserving, unique keys)
    #[serde(default, deserialize_with = "unique_targets")]
    pub generates: IndexMap<String, Target>,

    /// Execution policy
    #[serde(default)]
    pub policy: Policy,
}

/// One generation recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Generator module reference (path or package identifier)
    pub module: String,

    /// Export of the module that produces the visitor
    pub visitor_class: String,

    /// Leave an existing output file untouched
    #[serde(default)]
    pub if_not_exists: bool,

    /// Target configuration, overrides global keys
    #[serde(default)]
    pub config: ConfigMap,

    /// Commands to run after the file is written
    #[serde(default)]
    pub run_after: Vec<Command>,
}

/// A post-generation shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,

    /// Working directory (default: base directory of the run)
    #[serde(default)]
    pub dir: Option<String>,
}

/// Reject duplicate `generates` keys instead of silently keeping the last one.
fn unique_targets<'de, D>(deserializer: D) -> Result<IndexMap<String, Target>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TargetsVisitor;

    impl<'de> SerdeVisitor<'de> for TargetsVisitor {
        type Value = IndexMap<String, Target>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of output path to target")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(IndexMap::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut targets = IndexMap::new();
            while let Some((path, target)) = map.next_entry::<String, Target>()? {
                if targets.contains_key(&path) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate target '{}'",
                        path
                    )));
                }
                targets.insert(path, target);
            }
            Ok(targets)
        }
    }

    deserializer.deserialize_map(TargetsVisitor)
}

// ============================================================================
// Policy
// ============================================================================

/// Execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Failure handling
    #[serde(default)]
    pub failure: FailurePolicy,

    /// Targets generated concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Append run events to `.codeweft/events.jsonl`
    #[serde(default)]
    pub event_log: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            failure: FailurePolicy::default(),
            jobs: default_jobs(),
            event_log: false,
        }
    }
}

fn default_jobs() -> usize {
    1
}

/// Failure handling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report a failed target and move on to the next one.
    #[default]
    Continue,
    /// Stop starting new targets after the first failure.
    FailFast,
}

// ============================================================================
// Plan
// ============================================================================

/// What a run would do with a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Overwrite,
    Skip,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Overwrite => write!(f, "OVERWRITE"),
            Self::Skip => write!(f, "SKIP"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannedTarget {
    pub target: String,
    pub module: String,
    pub visitor_class: String,
    pub action: PlanAction,
    pub commands: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationPlan {
    pub targets: Vec<PlannedTarget>,
    pub to_create: u32,
    pub to_overwrite: u32,
    pub to_skip: u32,
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one target.
#[derive(Debug, Clone)]
pub enum TargetStatus {
    /// Written; `hash` is the BLAKE3 hash of the output.
    Generated {
        hash: String,
        bytes: usize,
        commands_run: usize,
    },
    /// `ifNotExists` target whose file already existed.
    Skipped,
    /// Not attempted because an earlier target failed under `fail_fast`.
    NotRun,
    Failed(TargetFailure),
}

#[derive(Debug, Clone)]
pub struct TargetResult {
    pub target: String,
    pub status: TargetStatus,
    pub duration: Duration,
}

impl TargetResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, TargetStatus::Failed(_))
    }
}

/// Aggregate outcome of a generation run, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub results: Vec<TargetResult>,
    pub total_duration: Duration,
}

impl GenerationReport {
    pub fn generated(&self) -> usize {
        self.count(|s| matches!(s, TargetStatus::Generated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, TargetStatus::Skipped))
    }

    pub fn not_run(&self) -> usize {
        self.count(|s| matches!(s, TargetStatus::NotRun))
    }

    pub fn failures(&self) -> Vec<&TargetFailure> {
        self.results
            .iter()
            .filter_map(|r| match &r.status {
                TargetStatus::Failed(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    /// Success only if no target failed or was left unattempted.
    pub fn is_success(&self) -> bool {
        self.failures().is_empty() && self.not_run() == 0
    }

    fn count(&self, pred: impl Fn(&TargetStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}

// ============================================================================
// Drift
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftStatus {
    Fresh,
    /// File on disk differs from what would be generated.
    Stale { expected: String, actual: String },
    Missing,
    /// `ifNotExists` target with an existing file; not compared.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct DriftFinding {
    pub target: String,
    pub status: Result<DriftStatus, TargetFailure>,
}

// ============================================================================
// Run events
// ============================================================================

/// Event for the JSONL run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    RunStarted {
        run_id: String,
        codeweft_version: String,
        targets: usize,
    },
    TargetSkipped {
        run_id: String,
        target: String,
    },
    TargetGenerated {
        run_id: String,
        target: String,
        hash: String,
        bytes: usize,
        duration_seconds: f64,
    },
    CommandCompleted {
        run_id: String,
        target: String,
        command: String,
        exit_code: i32,
    },
    TargetFailed {
        run_id: String,
        target: String,
        error: String,
    },
    RunCompleted {
        run_id: String,
        generated: usize,
        skipped: usize,
        failed: usize,
        total_seconds: f64,
    },
}

/// Event with timestamp wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: GenerationEvent,
}
