// src/pipeline/mod.rs

//! Multi-stage pipeline orchestration.
//!
//! - [`plan`] is the pure state machine deciding what runs next.
//! - [`executor`] runs a single stage (supervisor + readiness gate).
//! - [`orchestrator`] drives the plan through an executor.
//! - [`report`] is the terminal summary.
//! - [`feedback`] analyses the final snapshots into issues and recommendations.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod executor;
pub mod feedback;
pub mod orchestrator;
pub mod plan;
pub mod report;

pub use executor::{RealStageExecutor, StageExecutor, StageResult};
pub use feedback::{StageHealth, Verdict};
pub use orchestrator::Orchestrator;
pub use plan::PipelinePlan;
pub use report::{PipelineReport, StageReport};

/// Per-stage state within one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Never attempted because an earlier gating stage failed or the
    /// pipeline was interrupted.
    Skipped,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageState::Pending => "pending",
            StageState::Running => "running",
            StageState::Succeeded => "succeeded",
            StageState::Failed => "failed",
            StageState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
