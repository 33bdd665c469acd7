//! CW-019: Error taxonomy.
//!
//! Errors inside one target's pipeline (load → traverse → write → commands)
//! are `TargetError`s and stay attributed to that target. Everything that
//! happens before target processing starts is fatal to the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the type model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("type nesting exceeds maximum depth of {max}")]
    TypeDepthExceeded { max: usize },

    #[error("alias cycle: {}", .chain.join(" -> "))]
    AliasCycle { chain: Vec<String> },

    #[error("unknown alias '{name}'")]
    UnknownAlias { name: String },

    #[error("{location}: optional wraps another optional")]
    NestedOptional { location: String },

    #[error("duplicate definition name '{name}'")]
    DuplicateName { name: String },
}

/// A failure inside a single target's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("cannot load module '{module}': {message}")]
    ModuleLoad { module: String, message: String },

    #[error("module '{module}' has no usable export '{export}': {reason}")]
    VisitorExportMissing {
        module: String,
        export: String,
        reason: String,
    },

    #[error("hook {hook} failed at {node}: {message}")]
    VisitorRuntime {
        hook: String,
        node: String,
        message: String,
    },

    #[error("cannot write {}: {message}", .path.display())]
    FileWrite { path: PathBuf, message: String },

    #[error("command `{command}` exited with code {exit_code}{}", stderr_suffix(.stderr))]
    CommandExecution {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("cancelled before {stage}")]
    Cancelled { stage: &'static str },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// A `TargetError` tagged with the output path it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{target}: {error}")]
pub struct TargetFailure {
    pub target: String,
    #[source]
    pub error: TargetError,
}

/// Run-level errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),

    #[error("invalid schema {}: {message}", .path.display())]
    SchemaInvalid { path: PathBuf, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} target(s) failed")]
    TargetsFailed { failed: usize, total: usize },

    #[error("{stale} target(s) out of date")]
    Stale { stale: usize },

    #[error("generation cancelled")]
    Cancelled,

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
