// src/pipeline/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::entry::now;
use crate::record::Summary;

use super::feedback::{StageHealth, Verdict};
use super::StageState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub name: String,
    pub gating: bool,
    pub state: StageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Filled in from the final snapshot by [`super::feedback::attach`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<StageHealth>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Summary>,
}

impl StageReport {
    /// Human-readable one-liner.
    pub fn new(
        name: impl Into<String>,
        gating: bool,
        state: StageState,
        detail: Option<String>,
        duration_ms: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            gating,
            state,
            detail,
            duration_ms,
            health: None,
            issues: Vec::new(),
            metrics: None,
        }
    }

    pub fn line(&self) -> String {
        let marker = match self.state {
            StageState::Succeeded => "ok",
            StageState::Failed => "FAIL",
            StageState::Skipped => "skip",
            StageState::Pending => "pending",
            StageState::Running => "running",
        };
        let gating = if self.gating { "" } else { " (non-gating)" };
        let mut line = format!("[{marker}] {}{gating}: {}", self.name, self.state);
        if let Some(ref detail) = self.detail {
            line.push_str(" - ");
            line.push_str(detail);
        }
        if let Some(ms) = self.duration_ms {
            line.push_str(&format!(" ({ms}ms)"));
        }
        line
    }
}

/// Terminal summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub timestamp: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    /// A non-gating stage failed but the pipeline carried on.
    pub degraded: bool,
    /// Every gating stage succeeded.
    pub overall: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl PipelineReport {
    pub fn new(
        stages: Vec<StageReport>,
        degraded: bool,
        overall: bool,
        aborted: Option<String>,
    ) -> Self {
        Self {
            timestamp: now(),
            stages,
            degraded,
            overall,
            aborted,
            recommendations: Vec::new(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.overall { 0 } else { 1 }
    }

    pub fn verdict(&self) -> Verdict {
        if !self.stages.iter().any(|s| s.state == StageState::Succeeded) {
            Verdict::CriticalFailure
        } else if !self.overall {
            Verdict::Failure
        } else if self.degraded
            || self
                .stages
                .iter()
                .any(|s| matches!(s.health, Some(StageHealth::Unhealthy | StageHealth::NoData)))
        {
            Verdict::Degraded
        } else {
            Verdict::Success
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["Pipeline summary:".to_string()];
        lines.extend(self.stages.iter().map(|s| format!("  {}", s.line())));

        let verdict = match (self.overall, self.degraded) {
            (true, false) => "all gating stages succeeded".to_string(),
            (true, true) => "all gating stages succeeded (degraded: a non-gating stage failed)".to_string(),
            (false, _) => match self.aborted {
                Some(ref reason) => format!("FAILED: {reason}"),
                None => "FAILED".to_string(),
            },
        };
        lines.push(format!("Result: {verdict}"));
        if !self.recommendations.is_empty() {
            lines.push("Recommendations:".to_string());
            lines.extend(self.recommendations.iter().map(|r| format!("  - {}", r.replace("**", ""))));
        }
        lines
    }
}
