//! CW-008: Target orchestration: skip, render, write, then run commands.
//!
//! Each target gets a fresh visitor and context. Failures stay attributed to
//! their target; under the default policy the run continues with the next
//! one. With `jobs > 1` targets run on a bounded rayon pool and results keep
//! declaration order.

use super::cancel::CancellationSignal;
use super::context::Context;
use super::engine::traverse;
use super::model::Namespace;
use super::planner::{selected, should_skip};
use super::resolver::{command_dir, merge_config, resolve_path};
use super::types::*;
use super::writer::write_atomic;
use crate::audit::eventlog::RunLog;
use crate::audit::hasher;
use crate::error::{TargetError, TargetFailure};
use crate::loader::VisitorSource;
use crate::runner::{run_command, DirLocks};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Everything one generation run needs.
pub struct GenerateOptions<'a> {
    pub config: &'a GenConfig,
    pub namespace: &'a Namespace,
    /// Output paths, module references and command directories resolve here.
    pub base_dir: &'a Path,
    pub source: &'a dyn VisitorSource,
    pub cancel: &'a CancellationSignal,
    /// Only generate this output path.
    pub target_filter: Option<&'a str>,
    pub failure: FailurePolicy,
    pub jobs: usize,
}

impl<'a> GenerateOptions<'a> {
    /// Options with failure policy and pool size taken from the config.
    pub fn new(
        config: &'a GenConfig,
        namespace: &'a Namespace,
        base_dir: &'a Path,
        source: &'a dyn VisitorSource,
        cancel: &'a CancellationSignal,
    ) -> Self {
        Self {
            config,
            namespace,
            base_dir,
            source,
            cancel,
            target_filter: None,
            failure: config.policy.failure,
            jobs: config.policy.jobs,
        }
    }
}

/// State shared by all targets of one run.
struct RunState<'a> {
    opts: &'a GenerateOptions<'a>,
    log: RunLog,
    locks: DirLocks,
    abort: AtomicBool,
}

/// Generate every selected target and report per-target outcomes.
pub fn generate(opts: &GenerateOptions<'_>) -> GenerationReport {
    let started = Instant::now();
    let targets: Vec<(&String, &Target)> = selected(opts.config, opts.target_filter).collect();
    let state = RunState {
        opts,
        log: RunLog::new(opts.base_dir, opts.config.policy.event_log),
        locks: DirLocks::new(),
        abort: AtomicBool::new(false),
    };

    state.log.record(GenerationEvent::RunStarted {
        run_id: state.log.run_id().to_string(),
        codeweft_version: env!("CARGO_PKG_VERSION").to_string(),
        targets: targets.len(),
    });
    tracing::info!(targets = targets.len(), jobs = opts.jobs, "generation started");

    let results = if opts.jobs > 1 && targets.len() > 1 {
        run_parallel(&state, &targets)
    } else {
        run_sequential(&state, &targets)
    };

    let report = GenerationReport {
        results,
        total_duration: started.elapsed(),
    };
    state.log.record(GenerationEvent::RunCompleted {
        run_id: state.log.run_id().to_string(),
        generated: report.generated(),
        skipped: report.skipped(),
        failed: report.failures().len(),
        total_seconds: report.total_duration.as_secs_f64(),
    });
    tracing::info!(
        generated = report.generated(),
        skipped = report.skipped(),
        failed = report.failures().len(),
        not_run = report.not_run(),
        "generation finished"
    );
    report
}

fn run_sequential(state: &RunState<'_>, targets: &[(&String, &Target)]) -> Vec<TargetResult> {
    targets
        .iter()
        .map(|(path, target)| run_target(state, path, target))
        .collect()
}

fn run_parallel(state: &RunState<'_>, targets: &[(&String, &Target)]) -> Vec<TargetResult> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(state.opts.jobs)
        .build()
    {
        Ok(pool) => pool.install(|| {
            targets
                .par_iter()
                .map(|(path, target)| run_target(state, path, target))
                .collect()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "cannot start worker pool, running sequentially");
            run_sequential(state, targets)
        }
    }
}

fn run_target(state: &RunState<'_>, path: &str, target: &Target) -> TargetResult {
    let started = Instant::now();
    let status = match execute_target(state, path, target) {
        Ok(status) => status,
        Err(error) => {
            tracing::error!(output = path, error = %error, "target failed");
            state.log.record(GenerationEvent::TargetFailed {
                run_id: state.log.run_id().to_string(),
                target: path.to_string(),
                error: error.to_string(),
            });
            if state.opts.failure == FailurePolicy::FailFast {
                state.abort.store(true, Ordering::SeqCst);
            }
            TargetStatus::Failed(TargetFailure {
                target: path.to_string(),
                error,
            })
        }
    };
    TargetResult {
        target: path.to_string(),
        status,
        duration: started.elapsed(),
    }
}

fn execute_target(
    state: &RunState<'_>,
    path: &str,
    target: &Target,
) -> Result<TargetStatus, TargetError> {
    let opts = state.opts;
    if state.abort.load(Ordering::SeqCst) {
        return Ok(TargetStatus::NotRun);
    }
    if opts.cancel.is_cancelled() {
        return Err(TargetError::Cancelled { stage: "generation" });
    }

    let dest = resolve_path(opts.base_dir, path);
    if should_skip(target, &dest) {
        tracing::info!(output = path, "exists, skipped (ifNotExists)");
        state.log.record(GenerationEvent::TargetSkipped {
            run_id: state.log.run_id().to_string(),
            target: path.to_string(),
        });
        return Ok(TargetStatus::Skipped);
    }

    let started = Instant::now();
    let output = render_target(opts.config, opts.namespace, opts.source, path, target)?;

    // Buffer building may finish after cancellation; storage may not be touched.
    if opts.cancel.is_cancelled() {
        return Err(TargetError::Cancelled { stage: "write" });
    }
    write_atomic(&dest, &output).map_err(|message| TargetError::FileWrite {
        path: dest.clone(),
        message,
    })?;
    let hash = hasher::hash_string(&output);
    tracing::info!(output = path, bytes = output.len(), "generated");
    state.log.record(GenerationEvent::TargetGenerated {
        run_id: state.log.run_id().to_string(),
        target: path.to_string(),
        hash: hash.clone(),
        bytes: output.len(),
        duration_seconds: started.elapsed().as_secs_f64(),
    });

    let commands_run = run_commands(state, path, target)?;
    Ok(TargetStatus::Generated {
        hash,
        bytes: output.len(),
        commands_run,
    })
}

/// Run `runAfter` in order; the first non-zero exit stops the rest.
fn run_commands(state: &RunState<'_>, path: &str, target: &Target) -> Result<usize, TargetError> {
    let opts = state.opts;
    let mut ran = 0;
    for cmd in &target.run_after {
        if opts.cancel.is_cancelled() {
            return Err(TargetError::Cancelled { stage: "commands" });
        }
        let dir = command_dir(opts.base_dir, cmd);
        let lock = state.locks.for_dir(&dir);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let out = run_command(&cmd.command, &dir).map_err(|stderr| TargetError::CommandExecution {
            command: cmd.command.clone(),
            exit_code: -1,
            stderr,
        })?;
        ran += 1;
        state.log.record(GenerationEvent::CommandCompleted {
            run_id: state.log.run_id().to_string(),
            target: path.to_string(),
            command: cmd.command.clone(),
            exit_code: out.exit_code,
        });
        if !out.success() {
            return Err(TargetError::CommandExecution {
                command: cmd.command.clone(),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        tracing::debug!(output = path, command = %cmd.command, "command succeeded");
    }
    Ok(ran)
}

/// Instantiate the target's visitor and traverse into a fresh buffer.
/// Pure: never touches the destination file.
pub(crate) fn render_target(
    config: &GenConfig,
    namespace: &Namespace,
    source: &dyn VisitorSource,
    path: &str,
    target: &Target,
) -> Result<String, TargetError> {
    let mut visitor = source.instantiate(&target.module, &target.visitor_class)?;
    let merged = merge_config(&config.config, &target.config);
    let mut ctx = Context::new(path, namespace, merged);
    traverse(visitor.as_mut(), &mut ctx)?;
    Ok(ctx.into_output())
}
