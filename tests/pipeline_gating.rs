// tests/pipeline_gating.rs

mod common;

use std::time::Duration;

use common::{init_tracing, TestResult};
use devwatch_test_utils::builders::{ConfigFileBuilder, StageConfigBuilder};
use devwatch_test_utils::fake_executor::{FakeOutcome, FakeStageExecutor};
use devwatch_test_utils::with_timeout;

use devwatch::config::ConfigFile;
use devwatch::pipeline::{Orchestrator, PipelinePlan, StageState};
use devwatch::supervise::Interrupt;

fn chain(non_gating: &[&str]) -> ConfigFile {
    let mut builder = ConfigFileBuilder::new();
    for name in ["A", "B", "C"] {
        let stage = StageConfigBuilder::new(name, "true")
            .gating(!non_gating.contains(&name))
            .build();
        builder = builder.with_stage(stage);
    }
    builder.build()
}

#[test]
fn plan_runs_stages_one_at_a_time_in_order() {
    let mut plan = PipelinePlan::new([("A", true), ("B", true)]);

    assert_eq!(plan.next_stage(), Some(0));
    plan.mark_running(0);
    assert_eq!(plan.next_stage(), None, "nothing starts while a stage runs");

    plan.record_outcome(0, true, "ready", Duration::from_millis(5));
    assert_eq!(plan.next_stage(), Some(1));
    plan.mark_running(1);
    plan.record_outcome(1, true, "ready", Duration::from_millis(5));
    assert_eq!(plan.next_stage(), None);

    let report = plan.report();
    assert!(report.overall);
    assert!(!report.degraded);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn plan_skips_the_rest_after_a_gating_failure() {
    let mut plan = PipelinePlan::new([("A", true), ("B", true), ("C", true)]);
    plan.mark_running(0);
    plan.record_outcome(0, false, "not ready", Duration::ZERO);

    assert!(plan.is_aborted());
    assert_eq!(plan.next_stage(), None);
    assert_eq!(plan.state_of("A"), Some(StageState::Failed));
    assert_eq!(plan.state_of("B"), Some(StageState::Skipped));
    assert_eq!(plan.state_of("C"), Some(StageState::Skipped));

    let report = plan.report();
    assert!(!report.overall);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.aborted.as_deref(), Some("gating stage 'A' failed"));
}

#[test]
fn plan_abort_fails_running_and_skips_pending() {
    let mut plan = PipelinePlan::new([("A", true), ("B", false), ("C", true)]);
    plan.mark_running(0);
    plan.record_outcome(0, true, "ready", Duration::ZERO);
    plan.mark_running(1);
    plan.abort("interrupted by SIGINT");

    assert_eq!(plan.state_of("A"), Some(StageState::Succeeded));
    assert_eq!(plan.state_of("B"), Some(StageState::Failed));
    assert_eq!(plan.state_of("C"), Some(StageState::Skipped));
    assert!(!plan.overall());
}

#[tokio::test]
async fn gating_failure_skips_later_stages_and_fails_the_run() -> TestResult {
    init_tracing();
    let executor = FakeStageExecutor::new().with_outcome("A", FakeOutcome::NotReady);
    let executed = executor.executed();
    let shutdowns = executor.shutdowns();

    let report = with_timeout(Orchestrator::new(&chain(&[]), executor).run()).await;

    assert_eq!(*executed.lock().unwrap(), vec!["A".to_string()]);
    assert_eq!(report.stage("A").map(|s| s.state), Some(StageState::Failed));
    assert_eq!(report.stage("B").map(|s| s.state), Some(StageState::Skipped));
    assert_eq!(report.stage("C").map(|s| s.state), Some(StageState::Skipped));
    assert!(!report.overall);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(*shutdowns.lock().unwrap(), 1);
    Ok(())
}

#[tokio::test]
async fn non_gating_failure_degrades_but_continues() -> TestResult {
    init_tracing();
    let executor = FakeStageExecutor::new().with_outcome("B", FakeOutcome::NotReady);
    let executed = executor.executed();

    let report = with_timeout(Orchestrator::new(&chain(&["B"]), executor).run()).await;

    assert_eq!(
        *executed.lock().unwrap(),
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    );
    assert!(report.overall);
    assert!(report.degraded);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.stage("B").map(|s| s.state), Some(StageState::Failed));
    assert_eq!(report.stage("C").map(|s| s.state), Some(StageState::Succeeded));
    Ok(())
}

#[tokio::test]
async fn all_ready_succeeds() -> TestResult {
    let executor = FakeStageExecutor::new();
    let report = with_timeout(Orchestrator::new(&chain(&[]), executor).run()).await;

    assert!(report.overall);
    assert!(!report.degraded);
    assert!(report.aborted.is_none());
    assert!(report
        .stages
        .iter()
        .all(|s| s.state == StageState::Succeeded && s.duration_ms.is_some()));
    Ok(())
}

#[tokio::test]
async fn interrupt_during_a_stage_aborts_the_rest() -> TestResult {
    init_tracing();
    let executor = FakeStageExecutor::new()
        .with_outcome("B", FakeOutcome::Interrupted(Interrupt::Interrupt));
    let executed = executor.executed();

    let report = with_timeout(Orchestrator::new(&chain(&["B"]), executor).run()).await;

    // Even a non-gating stage stops the pipeline when it was interrupted.
    assert_eq!(*executed.lock().unwrap(), vec!["A".to_string(), "B".to_string()]);
    assert_eq!(report.stage("C").map(|s| s.state), Some(StageState::Skipped));
    assert_eq!(report.aborted.as_deref(), Some("interrupted by SIGINT"));
    assert_eq!(report.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn interrupt_before_start_runs_nothing() -> TestResult {
    let executor = FakeStageExecutor::new().interrupted_before_start(Interrupt::Terminate);
    let executed = executor.executed();
    let shutdowns = executor.shutdowns();

    let report = with_timeout(Orchestrator::new(&chain(&[]), executor).run()).await;

    assert!(executed.lock().unwrap().is_empty());
    assert!(report.stages.iter().all(|s| s.state == StageState::Skipped));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(*shutdowns.lock().unwrap(), 1);
    Ok(())
}

#[test]
fn report_lines_summarise_each_stage() {
    let mut plan = PipelinePlan::new([("runtime", true), ("analysis", false), ("deploy", true)]);
    plan.mark_running(0);
    plan.record_outcome(0, true, "ready (compiled)", Duration::from_millis(1200));
    plan.mark_running(1);
    plan.record_outcome(1, false, "process exited with code 1 before becoming ready (exited)", Duration::from_millis(300));
    plan.mark_running(2);
    plan.record_outcome(2, false, "not ready", Duration::from_millis(10));

    let lines = plan.report().lines();
    assert_eq!(lines[0], "Pipeline summary:");
    assert_eq!(lines[1], "  [ok] runtime: succeeded - ready (compiled) (1200ms)");
    assert!(lines[2].starts_with("  [FAIL] analysis (non-gating): failed - "));
    assert_eq!(lines[3], "  [FAIL] deploy: failed - not ready (10ms)");
    assert_eq!(lines[4], "Result: FAILED: gating stage 'deploy' failed");
}

#[test]
fn report_json_uses_camel_case() -> TestResult {
    let mut plan = PipelinePlan::new([("runtime", true)]);
    plan.mark_running(0);
    plan.record_outcome(0, true, "ready", Duration::from_millis(42));

    let json = serde_json::to_value(plan.report())?;
    assert_eq!(json["overall"], true);
    assert_eq!(json["degraded"], false);
    assert_eq!(json["stages"][0]["state"], "succeeded");
    assert_eq!(json["stages"][0]["durationMs"], 42);
    assert!(json.get("aborted").is_none());
    Ok(())
}
