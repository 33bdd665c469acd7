//! CW-021: CLI subcommands.

use crate::audit::drift;
use crate::core::cancel::CancellationSignal;
use crate::core::executor::{self, GenerateOptions};
use crate::core::model::Namespace;
use crate::core::parser;
use crate::core::resolver::resolve_path;
use crate::core::types::{DriftStatus, FailurePolicy, GenConfig, PlanAction, TargetStatus};
use crate::error::{Error, Result};
use crate::loader::ModuleLoader;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "codeweft.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "codeweft",
    version,
    about = "Schema-driven, multi-target code generation with Luau visitors"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a config, a sample schema and a sample generator
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate codeweft.yaml and its schema without generating
    Validate {
        /// Path to codeweft.yaml
        #[arg(default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Show what generate would do to each target
    Plan {
        /// Path to codeweft.yaml
        #[arg(default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Only this output path
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Generate every target
    Generate {
        /// Path to codeweft.yaml
        #[arg(default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Only this output path
        #[arg(short, long)]
        target: Option<String>,

        /// Worker threads (overrides policy.jobs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Stop at the first failing target
        #[arg(long)]
        fail_fast: bool,
    },

    /// Exit non-zero if any generated file is stale or missing (for CI)
    Check {
        /// Path to codeweft.yaml
        #[arg(default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Only this output path
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command. Relative paths resolve against the current directory.
pub fn dispatch(cmd: Commands, cancel: &CancellationSignal) -> Result<()> {
    let base_dir =
        std::env::current_dir().map_err(|e| Error::io("cannot read current directory", e))?;
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { config } => cmd_validate(&config, &base_dir),
        Commands::Plan { config, target } => cmd_plan(&config, &base_dir, target.as_deref()),
        Commands::Generate {
            config,
            target,
            jobs,
            fail_fast,
        } => cmd_generate(
            &config,
            &base_dir,
            &GenerateArgs {
                target,
                jobs,
                fail_fast,
            },
            cancel,
        ),
        Commands::Check { config, target } => cmd_check(&config, &base_dir, target.as_deref(), cancel),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "codeweft", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// CLI overrides for `generate`.
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub target: Option<String>,
    pub jobs: Option<usize>,
    pub fail_fast: bool,
}

const INIT_CONFIG: &str = r#"schema: schema.yaml

config:
  title: API Reference

generates:
  docs/types.md:
    module: ./generators/markdown
    visitorClass: MarkdownVisitor

policy:
  failure: continue
  jobs: 1
  event_log: false
"#;

const INIT_SCHEMA: &str = r#"name: example.v1
description: Example schema
types:
  - name: User
    description: A registered user
    fields:
      - name: id
        type: { kind: primitive, name: string }
      - name: email
        type: { kind: optional, type: { kind: primitive, name: string } }
      - name: roles
        type: { kind: list, type: { kind: enum, name: Role } }
enums:
  - name: Role
    values:
      - { name: Admin, index: 0 }
      - { name: Member, index: 1 }
"#;

const INIT_GENERATOR: &str = r##"type Ctx = { write: (any, string) -> (), [string]: any }

local Markdown = {}
Markdown.__index = Markdown

function Markdown.new()
    return setmetatable({}, Markdown)
end

function Markdown:visitNamespace(ctx: Ctx)
    ctx:write("# " .. (ctx.config.title or ctx.namespace.name) .. "\n")
end

function Markdown:visitTypeBefore(ctx: Ctx)
    ctx:write("\n## " .. ctx.type.name .. "\n\n")
    if ctx.type.description then
        ctx:write(ctx.type.description .. "\n\n")
    end
end

function Markdown:visitTypeField(ctx: Ctx)
    local ty = codeweft.expandType(ctx.field.type)
    local marker = if codeweft.isOptional(ctx.field.type) then " (optional)" else ""
    ctx:write("- `" .. ctx.field.name .. "`: " .. ty .. marker .. "\n")
end

return { MarkdownVisitor = Markdown }
"##;

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG);
    if config_path.exists() {
        return Err(Error::AlreadyExists(config_path));
    }

    let files = [
        (config_path, INIT_CONFIG),
        (path.join("schema.yaml"), INIT_SCHEMA),
        (path.join("generators/markdown.luau"), INIT_GENERATOR),
    ];
    for (file, content) in &files {
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("cannot create {}", parent.display()), e))?;
        }
        std::fs::write(file, content)
            .map_err(|e| Error::io(format!("cannot write {}", file.display()), e))?;
    }

    println!("Initialized codeweft project at {}", path.display());
    for (file, _) in &files {
        println!("  Created: {}", file.display());
    }
    Ok(())
}

/// Load config and schema; every failure here is fatal before any target runs.
fn load(config_path: &Path, base_dir: &Path) -> Result<(GenConfig, Namespace)> {
    let config_path = resolve_path(base_dir, &config_path.to_string_lossy());
    let config = parser::load_config(&config_path)?;
    let namespace = parser::load_schema(&resolve_path(base_dir, &config.schema))?;
    Ok((config, namespace))
}

fn cmd_validate(config_path: &Path, base_dir: &Path) -> Result<()> {
    let (config, namespace) = load(config_path, base_dir)?;
    println!(
        "OK: {} ({} targets; {} types, {} enums, {} unions, {} aliases)",
        namespace.name,
        config.generates.len(),
        namespace.types.len(),
        namespace.enums.len(),
        namespace.unions.len(),
        namespace.aliases.len()
    );
    Ok(())
}

fn cmd_plan(config_path: &Path, base_dir: &Path, target: Option<&str>) -> Result<()> {
    let config_path = resolve_path(base_dir, &config_path.to_string_lossy());
    let config = parser::load_config(&config_path)?;
    let plan = crate::core::planner::plan(&config, base_dir, target);

    println!("Planning: {} target(s)", plan.targets.len());
    println!();
    for t in &plan.targets {
        let symbol = match t.action {
            PlanAction::Create => "+",
            PlanAction::Overwrite => "~",
            PlanAction::Skip => " ",
        };
        let commands = match t.commands {
            0 => String::new(),
            n => format!(", then {} command(s)", n),
        };
        println!(
            "  {} {} ({}::{}{})",
            symbol, t.target, t.module, t.visitor_class, commands
        );
    }
    println!();
    println!(
        "Plan: {} to create, {} to overwrite, {} skipped.",
        plan.to_create, plan.to_overwrite, plan.to_skip
    );
    Ok(())
}

fn cmd_generate(
    config_path: &Path,
    base_dir: &Path,
    args: &GenerateArgs,
    cancel: &CancellationSignal,
) -> Result<()> {
    let (config, namespace) = load(config_path, base_dir)?;
    let loader = ModuleLoader::new(base_dir);

    let mut opts = GenerateOptions::new(&config, &namespace, base_dir, &loader, cancel);
    opts.target_filter = args.target.as_deref();
    if let Some(jobs) = args.jobs {
        opts.jobs = jobs.max(1);
    }
    if args.fail_fast {
        opts.failure = FailurePolicy::FailFast;
    }

    let report = executor::generate(&opts);
    for result in &report.results {
        match &result.status {
            TargetStatus::Generated {
                bytes,
                commands_run,
                ..
            } => println!(
                "  + {} ({} bytes, {} command(s), {:.2}s)",
                result.target,
                bytes,
                commands_run,
                result.duration.as_secs_f64()
            ),
            TargetStatus::Skipped => println!("  = {} (exists, skipped)", result.target),
            TargetStatus::NotRun => println!("  - {} (not run)", result.target),
            TargetStatus::Failed(failure) => {
                println!("  x {} FAILED", result.target);
                eprintln!("error: {}", failure);
            }
        }
    }

    println!();
    let failed = report.failures().len() + report.not_run();
    if failed > 0 {
        println!(
            "Generate completed with errors: {} generated, {} skipped, {} FAILED ({:.2}s)",
            report.generated(),
            report.skipped(),
            failed,
            report.total_duration.as_secs_f64()
        );
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        return Err(Error::TargetsFailed {
            failed,
            total: report.results.len(),
        });
    }
    println!(
        "Generate complete: {} generated, {} skipped ({:.2}s).",
        report.generated(),
        report.skipped(),
        report.total_duration.as_secs_f64()
    );
    Ok(())
}

fn cmd_check(
    config_path: &Path,
    base_dir: &Path,
    target: Option<&str>,
    cancel: &CancellationSignal,
) -> Result<()> {
    let (config, namespace) = load(config_path, base_dir)?;
    let loader = ModuleLoader::new(base_dir);
    let findings = drift::check(&drift::CheckOptions {
        config: &config,
        namespace: &namespace,
        base_dir,
        source: &loader,
        cancel,
        target_filter: target,
    });

    for finding in &findings {
        match &finding.status {
            Ok(DriftStatus::Fresh) => println!("  ok {}", finding.target),
            Ok(DriftStatus::Skipped) => println!("  =  {} (ifNotExists)", finding.target),
            Ok(DriftStatus::Missing) => println!("  ?  {} MISSING", finding.target),
            Ok(DriftStatus::Stale { expected, actual }) => {
                println!("  ~  {} STALE", finding.target);
                println!("       expected: {}", expected);
                println!("       actual:   {}", actual);
            }
            Err(failure) => {
                println!("  x  {} FAILED", finding.target);
                eprintln!("error: {}", failure);
            }
        }
    }

    let stale = drift::count_drifted(&findings);
    if stale > 0 {
        return Err(Error::Stale { stale });
    }
    println!("All {} target(s) up to date.", findings.len());
    Ok(())
}
