// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod ready;
pub mod record;
pub mod store;
pub mod supervise;
pub mod types;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::duration::format_duration;
use crate::config::validate::check_stage_name;
use crate::config::{load_and_validate, load_from_path, ConfigFile, ConfigSection};
use crate::errors::DevwatchError;
use crate::pipeline::{feedback, Orchestrator, RealStageExecutor};
use crate::ready::{ReadinessPredicate, ReadinessWaiter};
use crate::record::{spawn_recorder, LogRecorder};
use crate::store::{StatusStore, FEEDBACK_FILE};
use crate::supervise::{shutdown_channel, spawn_signal_listener, CommandSpec, ProcessSupervisor};
use crate::types::ReadinessCondition;

const RECORDER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => run_pipeline(&args).await,
        Command::Watch {
            name,
            shell,
            quiet,
            command,
        } => watch_one(&args, &name, shell, quiet, &command).await,
        Command::Wait {
            name,
            until,
            pattern,
            timeout,
        } => wait_for(&args, &name, until, pattern.as_deref(), timeout).await,
        Command::Status { name } => print_status(&args, name.as_deref()),
    }
}

async fn run_pipeline(args: &CliArgs) -> Result<i32> {
    let mut cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(ref dir) = args.status_dir {
        cfg.config.status_dir = dir.clone();
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(0);
    }

    let store = StatusStore::new(&cfg.config.status_dir);
    let (shutdown_tx, _shutdown_rx) = shutdown_channel();
    let _signals = spawn_signal_listener(shutdown_tx.clone());

    let executor = RealStageExecutor::new(store.clone(), &cfg.config, shutdown_tx);
    let mut report = Orchestrator::new(&cfg, executor).run().await;
    feedback::attach(&mut report, &cfg.stage, &store);

    match feedback::publish(&store, &report) {
        Ok(()) => info!(
            verdict = %report.verdict(),
            path = %store.dir().join(FEEDBACK_FILE).display(),
            "feedback written"
        ),
        Err(e) => warn!(error = %e, "failed to write pipeline report"),
    }

    for line in report.lines() {
        println!("{line}");
    }
    Ok(report.exit_code())
}

async fn watch_one(
    args: &CliArgs,
    name: &str,
    shell: bool,
    quiet: bool,
    argv: &[String],
) -> Result<i32> {
    check_stage_name(name)?;
    let settings = settings_for(args)?;
    let command = CommandSpec::from_argv(argv, shell)
        .ok_or_else(|| DevwatchError::ConfigError("no command given".to_string()))?;

    if args.dry_run {
        println!("devwatch dry-run");
        println!("  stage: {name}");
        println!("  cmd: {}", command.display());
        println!("  snapshot: {}", StatusStore::new(&settings.status_dir).path_for(name).display());
        return Ok(0);
    }

    let store = StatusStore::new(&settings.status_dir);
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let _signals = spawn_signal_listener(shutdown_tx);

    let (recorder, recorder_join) = spawn_recorder(LogRecorder::start(name, store));
    let supervisor = ProcessSupervisor::new(
        recorder,
        settings.shutdown_grace,
        settings.echo_output && !quiet,
    );
    let outcome = supervisor.run(&command, shutdown_rx).await;
    drop(supervisor);

    // A reader still attached to an orphaned pipe keeps the actor alive; the
    // final snapshot is already on disk by now.
    match tokio::time::timeout(RECORDER_JOIN_TIMEOUT, recorder_join).await {
        Ok(Ok(snapshot)) => info!(stage = name, summary = %snapshot.describe(), "final snapshot"),
        Ok(Err(e)) => warn!(stage = name, error = %e, "recorder task failed"),
        Err(_) => debug!(stage = name, "recorder still draining; not waiting for it"),
    }

    println!("{name}: {outcome}");
    Ok(if outcome.is_success() { 0 } else { 1 })
}

async fn wait_for(
    args: &CliArgs,
    name: &str,
    until: ReadinessCondition,
    pattern: Option<&str>,
    timeout: Duration,
) -> Result<i32> {
    check_stage_name(name)?;
    let settings = settings_for(args)?;
    let predicate = ReadinessPredicate::new(until, pattern)?;
    let waiter = ReadinessWaiter::new(StatusStore::new(&settings.status_dir), settings.poll_interval);

    let ready = waiter
        .wait_until(name, |snapshot| predicate.matches(snapshot), timeout)
        .await;

    if ready {
        println!("{name}: ready ({})", predicate.describe());
        Ok(0)
    } else {
        println!(
            "{name}: not ready within {} ({})",
            format_duration(timeout),
            predicate.describe()
        );
        Ok(1)
    }
}

fn print_status(args: &CliArgs, name: Option<&str>) -> Result<i32> {
    let settings = settings_for(args)?;
    let store = StatusStore::new(&settings.status_dir);

    let names = match name {
        Some(name) => vec![name.to_string()],
        None => store.list()?,
    };

    if names.is_empty() {
        println!("no snapshots in {}", store.dir().display());
        return Ok(0);
    }

    for stage in names {
        match store.try_read(&stage)? {
            Some(snapshot) => println!("{stage}: {}", snapshot.describe()),
            None => return Err(DevwatchError::StageNotFound(stage).into()),
        }
    }
    Ok(0)
}

/// `[config]` for the single-stage commands.
///
/// The config file is optional here: without one the defaults apply.
fn settings_for(args: &CliArgs) -> Result<ConfigSection> {
    let mut settings = if Path::new(&args.config).exists() {
        load_from_path(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
            .config
    } else {
        debug!(path = %args.config.display(), "no config file; using defaults");
        ConfigSection::default()
    };
    if let Some(ref dir) = args.status_dir {
        settings.status_dir = dir.clone();
    }
    Ok(settings)
}

fn print_dry_run(cfg: &ConfigFile) {
    println!("devwatch dry-run");
    println!("  config.status_dir = {}", cfg.config.status_dir.display());
    println!(
        "  config.poll_interval = {}",
        format_duration(cfg.config.poll_interval)
    );
    println!(
        "  config.shutdown_grace = {}",
        format_duration(cfg.config.shutdown_grace)
    );
    println!();

    println!("stages ({}):", cfg.stage.len());
    for stage in &cfg.stage {
        println!("  - {}", stage.name);
        println!("      cmd: {}", stage.display_command());
        if stage.shell {
            println!("      shell: true");
        }
        if let Some(ref cwd) = stage.cwd {
            println!("      cwd: {}", cwd.display());
        }
        if !stage.gating {
            println!("      gating: false");
        }
        println!("      ready_when: {}", stage.ready_when);
        if let Some(ref pattern) = stage.ready_pattern {
            println!("      ready_pattern: {pattern}");
        }
        if let Some(delay) = stage.ready_delay {
            println!("      ready_delay: {}", format_duration(delay));
        }
        println!("      timeout: {}", format_duration(stage.timeout));
    }

    debug!("dry-run complete (no execution)");
}
