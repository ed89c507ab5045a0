// tests/cli_args.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use devwatch::cli::{CliArgs, Command, LogLevel};
use devwatch::logging::resolve_level;
use devwatch::types::ReadinessCondition;

#[test]
fn no_arguments_runs_the_default_pipeline() {
    let args = CliArgs::try_parse_from(["devwatch"]).unwrap();
    assert!(args.command.is_none());
    assert_eq!(args.config, PathBuf::from("Devwatch.toml"));
    assert!(args.status_dir.is_none());
    assert!(!args.dry_run);
}

#[test]
fn global_flags_work_after_the_subcommand() {
    let args = CliArgs::try_parse_from([
        "devwatch",
        "run",
        "--config",
        "ci/Devwatch.toml",
        "--status-dir",
        "out",
        "--dry-run",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert!(matches!(args.command, Some(Command::Run)));
    assert_eq!(args.config, PathBuf::from("ci/Devwatch.toml"));
    assert_eq!(args.status_dir, Some(PathBuf::from("out")));
    assert!(args.dry_run);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
}

#[test]
fn watch_takes_the_command_after_double_dash() {
    let args = CliArgs::try_parse_from([
        "devwatch", "watch", "--name", "runtime", "--", "npm", "run", "dev", "--port", "3000",
    ])
    .unwrap();
    match args.command {
        Some(Command::Watch {
            name,
            shell,
            quiet,
            command,
        }) => {
            assert_eq!(name, "runtime");
            assert!(!shell);
            assert!(!quiet);
            assert_eq!(command, vec!["npm", "run", "dev", "--port", "3000"]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn watch_requires_a_command() {
    assert!(CliArgs::try_parse_from(["devwatch", "watch", "--name", "runtime"]).is_err());
}

#[test]
fn wait_defaults_and_overrides() {
    let args = CliArgs::try_parse_from(["devwatch", "wait", "runtime"]).unwrap();
    match args.command {
        Some(Command::Wait {
            name,
            until,
            pattern,
            timeout,
        }) => {
            assert_eq!(name, "runtime");
            assert_eq!(until, ReadinessCondition::Compiled);
            assert!(pattern.is_none());
            assert_eq!(timeout, Duration::from_secs(60));
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let args = CliArgs::try_parse_from([
        "devwatch", "wait", "analysis", "--until", "exited", "--timeout", "1500ms",
    ])
    .unwrap();
    match args.command {
        Some(Command::Wait { until, timeout, .. }) => {
            assert_eq!(until, ReadinessCondition::Exited);
            assert_eq!(timeout, Duration::from_millis(1500));
        }
        other => panic!("unexpected command: {other:?}"),
    }

    assert!(CliArgs::try_parse_from(["devwatch", "wait", "x", "--until", "soon"]).is_err());
    assert!(CliArgs::try_parse_from(["devwatch", "wait", "x", "--timeout", "5"]).is_err());
}

#[test]
fn status_name_is_optional() {
    let args = CliArgs::try_parse_from(["devwatch", "status"]).unwrap();
    assert!(matches!(args.command, Some(Command::Status { name: None })));

    let args = CliArgs::try_parse_from(["devwatch", "status", "runtime"]).unwrap();
    match args.command {
        Some(Command::Status { name }) => assert_eq!(name.as_deref(), Some("runtime")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn log_level_resolution_order() {
    assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), tracing::Level::TRACE);
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some(" WARNING ")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("nonsense")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
