// src/pipeline/feedback.rs

//! Post-run analysis of the stage snapshots.
//!
//! Once the pipeline has been torn down, every stage's final snapshot is read
//! back and turned into a health verdict with a list of issues. The report
//! then gains recommendations and is rendered as markdown next to the JSON
//! report.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StageConfig;
use crate::errors::Result;
use crate::record::{StatusSnapshot, Summary};
use crate::store::StatusStore;
use crate::types::ReadinessCondition;

use super::report::{PipelineReport, StageReport};
use super::StageState;

const NOT_COMPILED: &str = "did not compile successfully";

/// Health of one stage as read from its final snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageHealth {
    Healthy,
    Unhealthy,
    /// No snapshot was written, or the stage never ran.
    NoData,
}

impl fmt::Display for StageHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageHealth::Healthy => "HEALTHY",
            StageHealth::Unhealthy => "UNHEALTHY",
            StageHealth::NoData => "NO_DATA",
        };
        f.write_str(s)
    }
}

/// Overall verdict of a run, coarser than the per-stage states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Every gating stage succeeded and every stage that ran is healthy.
    Success,
    /// Gating stages succeeded, but some stage failed or is unhealthy.
    Degraded,
    /// A gating stage failed.
    Failure,
    /// Not a single stage succeeded.
    CriticalFailure,
}

impl Verdict {
    pub fn description(self) -> &'static str {
        match self {
            Verdict::Success => "All stages are operating normally.",
            Verdict::Degraded => {
                "Gating stages succeeded, but at least one stage reported problems."
            }
            Verdict::Failure => "A gating stage failed; later stages were skipped.",
            Verdict::CriticalFailure => "No stage succeeded.",
        }
    }

    pub fn next_steps(self) -> &'static [&'static str] {
        match self {
            Verdict::Success => &["Continue development; the stack is ready for testing."],
            Verdict::Degraded => &[
                "Review the unhealthy stages listed above.",
                "Re-run `devwatch run` once they are fixed.",
            ],
            Verdict::Failure => &[
                "Fix the failed gating stage first.",
                "Re-run `devwatch run` to reach the skipped stages.",
            ],
            Verdict::CriticalFailure => &[
                "Check that every stage command starts at all.",
                "Fix compilation issues in the first stage.",
                "Re-run `devwatch run`.",
            ],
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Success => "SUCCESS",
            Verdict::Degraded => "DEGRADED",
            Verdict::Failure => "FAILURE",
            Verdict::CriticalFailure => "CRITICAL_FAILURE",
        };
        f.write_str(s)
    }
}

/// What a final snapshot says about its stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAnalysis {
    pub health: StageHealth,
    pub issues: Vec<String>,
    pub metrics: Option<Summary>,
}

/// Derive health and issues from a stage's final snapshot.
///
/// The compile check only applies when `expects_compile` is set, i.e. the
/// stage gates on [`ReadinessCondition::Compiled`].
pub fn analyze_snapshot(snapshot: Option<&StatusSnapshot>, expects_compile: bool) -> StageAnalysis {
    let Some(snapshot) = snapshot else {
        return StageAnalysis {
            health: StageHealth::NoData,
            issues: vec!["no status snapshot; the stage did not start or failed to start".to_string()],
            metrics: None,
        };
    };

    let summary = snapshot.summary;
    let mut issues = Vec::new();
    if summary.error_count > 0 {
        issues.push(format!("{} error(s) detected", summary.error_count));
    }
    if expects_compile && !summary.has_compiled {
        issues.push(NOT_COMPILED.to_string());
    }
    if !summary.is_healthy {
        issues.push("health check failed".to_string());
    }

    StageAnalysis {
        health: if summary.is_healthy {
            StageHealth::Healthy
        } else {
            StageHealth::Unhealthy
        },
        issues,
        metrics: Some(summary),
    }
}

/// Read every stage's final snapshot and attach the analysis to `report`.
///
/// Stages that never ran are not looked up, so a snapshot left over from an
/// earlier run cannot leak into this report.
pub fn attach(report: &mut PipelineReport, stages: &[StageConfig], store: &StatusStore) {
    for stage_report in &mut report.stages {
        let analysis = match stage_report.state {
            StageState::Pending | StageState::Skipped => StageAnalysis {
                health: StageHealth::NoData,
                issues: vec!["stage did not run".to_string()],
                metrics: None,
            },
            StageState::Running | StageState::Succeeded | StageState::Failed => {
                let expects_compile = stages
                    .iter()
                    .find(|s| s.name == stage_report.name)
                    .is_some_and(|s| s.ready_when == ReadinessCondition::Compiled);
                analyze_snapshot(store.read(&stage_report.name).as_ref(), expects_compile)
            }
        };
        debug!(stage = %stage_report.name, health = %analysis.health, issues = analysis.issues.len(), "stage analysed");

        stage_report.health = Some(analysis.health);
        stage_report.issues = analysis.issues;
        stage_report.metrics = analysis.metrics;
    }

    report.recommendations = recommendations(&report.stages, store);
}

/// Concrete follow-ups for every stage that ran and is not healthy.
pub fn recommendations(stages: &[StageReport], store: &StatusStore) -> Vec<String> {
    let mut out = Vec::new();

    for stage in stages {
        if matches!(stage.state, StageState::Pending | StageState::Skipped) {
            continue;
        }
        let name = &stage.name;
        let log = store.path_for(name);

        if stage.health == Some(StageHealth::NoData) {
            out.push(format!(
                "**{name}**: make sure the command exists and can be started"
            ));
        }
        if stage.issues.iter().any(|i| i == NOT_COMPILED) {
            out.push(format!(
                "**{name}**: fix compilation issues; look for syntax errors and missing dependencies"
            ));
        }
        if let Some(summary) = stage.metrics.filter(|m| !m.is_healthy) {
            if summary.error_count > 0 {
                out.push(format!(
                    "**{name}**: address the {} error(s) recorded in `{}`",
                    summary.error_count,
                    log.display()
                ));
            } else {
                out.push(format!(
                    "**{name}**: no success output was seen; check `{}`",
                    log.display()
                ));
            }
        }

        if stage.state == StageState::Failed && stage.health == Some(StageHealth::Healthy) {
            out.push(format!(
                "**{name}**: readiness was not reached; raise `timeout` or adjust `ready_when`"
            ));
        }
    }

    if out.is_empty() {
        out.push("All stages operational; no action required".to_string());
    }
    out
}

/// Render the feedback document written to `feedback.md`.
pub fn render_markdown(report: &PipelineReport) -> String {
    let verdict = report.verdict();
    let mut md = String::new();

    let _ = writeln!(md, "# Development feedback report");
    let _ = writeln!(md, "Generated: {}", report.timestamp.to_rfc3339());
    let _ = writeln!(md);
    let _ = writeln!(md, "## Overall status: {verdict}");
    let _ = writeln!(md);
    let _ = writeln!(md, "**{verdict}**: {}", verdict.description());
    if let Some(ref reason) = report.aborted {
        let _ = writeln!(md);
        let _ = writeln!(md, "Aborted: {reason}");
    }

    for stage in &report.stages {
        let _ = writeln!(md);
        let _ = writeln!(md, "---");
        let _ = writeln!(md);
        let _ = writeln!(md, "## Stage `{}`", stage.name);
        let _ = writeln!(md);
        let gating = if stage.gating { "gating" } else { "non-gating" };
        let _ = writeln!(md, "**State:** {} ({gating})  ", stage.state);
        if let Some(health) = stage.health {
            let _ = writeln!(md, "**Health:** {health}  ");
        }
        if let Some(ref detail) = stage.detail {
            let _ = writeln!(md, "**Detail:** {detail}  ");
        }

        if let Some(summary) = stage.metrics {
            let _ = writeln!(md);
            let _ = writeln!(md, "### Metrics");
            let _ = writeln!(md, "- Total logs: {}", summary.total_logs);
            let _ = writeln!(md, "- Errors: {}", summary.error_count);
            let _ = writeln!(md, "- Warnings: {}", summary.warning_count);
            let _ = writeln!(md, "- Successes: {}", summary.success_count);
            let _ = writeln!(md, "- Compiled: {}", if summary.has_compiled { "yes" } else { "no" });
        }

        if !stage.issues.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "### Issues");
            for issue in &stage.issues {
                let _ = writeln!(md, "- {issue}");
            }
        }
    }

    let _ = writeln!(md);
    let _ = writeln!(md, "---");
    let _ = writeln!(md);
    let _ = writeln!(md, "## Recommendations");
    let _ = writeln!(md);
    for rec in &report.recommendations {
        let _ = writeln!(md, "- {rec}");
    }

    let _ = writeln!(md);
    let _ = writeln!(md, "## Next steps");
    let _ = writeln!(md);
    for (i, step) in verdict.next_steps().iter().enumerate() {
        let _ = writeln!(md, "{}. {step}", i + 1);
    }

    md
}

/// Persist the JSON report and the markdown feedback next to the snapshots.
pub fn publish(store: &StatusStore, report: &PipelineReport) -> Result<()> {
    store.write_report(report)?;
    store.write_feedback(&render_markdown(report))?;
    Ok(())
}
