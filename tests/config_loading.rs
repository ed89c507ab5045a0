// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use devwatch::config::duration::{format_duration, parse_duration};
use devwatch::config::{load_and_validate, load_from_str, validate_config, ConfigFile};
use devwatch::errors::DevwatchError;
use devwatch::types::ReadinessCondition;
use devwatch_test_utils::builders::{ConfigFileBuilder, StageConfigBuilder};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn expect_config_error(toml: &str, needle: &str) {
    let raw = load_from_str(toml).expect("toml parses");
    match ConfigFile::try_from(raw) {
        Err(DevwatchError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}")
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn minimal_stage_gets_defaults() {
    let raw = load_from_str(
        r#"
[[stage]]
name = "runtime"
cmd = "npm"
"#,
    )
    .unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();

    assert_eq!(cfg.config.status_dir, PathBuf::from(".cursor"));
    assert_eq!(cfg.config.poll_interval, Duration::from_secs(1));
    assert_eq!(cfg.config.shutdown_grace, Duration::from_secs(5));
    assert!(cfg.config.echo_output);

    let stage = cfg.stage("runtime").unwrap();
    assert!(stage.args.is_empty());
    assert!(!stage.shell);
    assert!(stage.gating);
    assert_eq!(stage.timeout, Duration::from_secs(60));
    assert_eq!(stage.ready_delay, None);
    assert_eq!(stage.ready_when, ReadinessCondition::Compiled);
    assert_eq!(stage.ready_pattern, None);
}

#[test]
fn full_config_is_parsed_in_order() {
    let raw = load_from_str(
        r#"
[config]
status_dir = "status"
poll_interval = "250ms"
shutdown_grace = "2s"
echo_output = false

[[stage]]
name = "runtime"
cmd = "npm"
args = ["run", "dev"]
cwd = "web"
timeout = "2m"
ready_delay = "5s"
ready_pattern = "Local:"

[[stage]]
name = "analysis"
cmd = "node tools/feedback-analyzer.js"
shell = true
gating = false
ready_when = "exited"
"#,
    )
    .unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();

    assert_eq!(cfg.config.status_dir, PathBuf::from("status"));
    assert_eq!(cfg.config.poll_interval, Duration::from_millis(250));
    assert!(!cfg.config.echo_output);

    let names: Vec<_> = cfg.stage.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["runtime", "analysis"]);

    let runtime = &cfg.stage[0];
    assert_eq!(runtime.display_command(), "npm run dev");
    assert_eq!(runtime.cwd, Some(PathBuf::from("web")));
    assert_eq!(runtime.timeout, Duration::from_secs(120));
    assert_eq!(runtime.ready_delay, Some(Duration::from_secs(5)));
    assert_eq!(runtime.ready_pattern.as_deref(), Some("Local:"));

    let analysis = &cfg.stage[1];
    assert!(analysis.shell);
    assert!(!analysis.gating);
    assert_eq!(analysis.ready_when, ReadinessCondition::Exited);
}

#[test]
fn demo_configs_are_valid() {
    for name in ["Devwatch.toml", "shell-smoke.toml"] {
        let cfg = load_and_validate(demo(name))
            .unwrap_or_else(|e| panic!("{name} should be valid: {e}"));
        assert_eq!(cfg.stage.len(), 2, "{name}");
    }
}

#[test]
fn empty_pipeline_is_rejected() {
    expect_config_error("[config]\nstatus_dir = \".cursor\"\n", "at least one [[stage]]");
}

#[test]
fn duplicate_stage_names_are_rejected() {
    expect_config_error(
        r#"
[[stage]]
name = "a"
cmd = "true"

[[stage]]
name = "a"
cmd = "false"
"#,
        "duplicate stage name 'a'",
    );
}

#[test]
fn unsafe_stage_names_are_rejected() {
    expect_config_error(
        r#"
[[stage]]
name = "../etc"
cmd = "true"
"#,
        "may only contain",
    );
}

#[test]
fn empty_command_is_rejected() {
    expect_config_error(
        r#"
[[stage]]
name = "a"
cmd = "   "
"#,
        "empty `cmd`",
    );
}

#[test]
fn zero_timeout_and_poll_interval_are_rejected() {
    expect_config_error(
        r#"
[[stage]]
name = "a"
cmd = "true"
timeout = "0s"
"#,
        "timeout",
    );
    expect_config_error(
        r#"
[config]
poll_interval = "0ms"

[[stage]]
name = "a"
cmd = "true"
"#,
        "poll_interval",
    );
}

#[test]
fn invalid_ready_pattern_is_rejected() {
    expect_config_error(
        r#"
[[stage]]
name = "a"
cmd = "true"
ready_pattern = "(["
"#,
        "ready_pattern",
    );
}

#[test]
fn bad_duration_or_condition_is_a_toml_error() {
    for toml in [
        "[[stage]]\nname = \"a\"\ncmd = \"true\"\ntimeout = \"soon\"\n",
        "[[stage]]\nname = \"a\"\ncmd = \"true\"\nready_when = \"eventually\"\n",
        "[[stage]]\nname = \"a\"\ncmd = \"true\"\ntimeout = \"307445734561825861m\"\n",
    ] {
        match load_from_str(toml) {
            Err(DevwatchError::TomlError(_)) => {}
            other => panic!("expected TomlError, got {other:?}"),
        }
    }
}

#[test]
fn loading_from_disk_reports_io_and_parse_errors() {
    match load_and_validate("/definitely/not/here/Devwatch.toml") {
        Err(DevwatchError::IoError(_)) => {}
        other => panic!("expected IoError, got {other:?}"),
    }

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[[stage]\nname = ").unwrap();
    match load_and_validate(file.path()) {
        Err(DevwatchError::TomlError(_)) => {}
        other => panic!("expected TomlError, got {other:?}"),
    }
}

#[test]
fn builder_configs_go_through_the_same_validation() {
    let raw = ConfigFileBuilder::new()
        .with_stage(StageConfigBuilder::new("a", "true").build())
        .with_stage(StageConfigBuilder::new("a", "true").build())
        .build_raw();
    assert!(matches!(
        validate_config(&raw),
        Err(DevwatchError::ConfigError(_))
    ));
}

#[test]
fn durations_parse_and_format() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("5d").is_err());
    assert!(parse_duration("ms").is_err());

    let overflow = parse_duration("307445734561825861m").unwrap_err();
    assert!(overflow.contains("out of range"), "{overflow}");
    assert!(parse_duration("5124095576030432h").is_err());
    assert_eq!(
        parse_duration("307445734561825860m"),
        Ok(Duration::from_secs(307445734561825860 * 60))
    );

    assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
    assert_eq!(format_duration(Duration::from_secs(90)), "90s");
    assert_eq!(format_duration(Duration::from_secs(120)), "2m");
    assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
}
