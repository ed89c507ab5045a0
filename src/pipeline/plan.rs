// src/pipeline/plan.rs

//! Pure pipeline state machine.
//!
//! [`PipelinePlan`] decides which stage runs next and what a stage outcome
//! means for the rest of the pipeline. It performs no IO and holds no Tokio
//! types, so the gating rules can be tested without processes.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ConfigFile;

use super::report::{PipelineReport, StageReport};
use super::StageState;

#[derive(Debug, Clone)]
struct PlanEntry {
    name: String,
    gating: bool,
    state: StageState,
    detail: Option<String>,
    elapsed: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PipelinePlan {
    entries: Vec<PlanEntry>,
    aborted: Option<String>,
}

impl PipelinePlan {
    /// Build a plan from `(name, gating)` pairs in execution order.
    pub fn new<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let entries = stages
            .into_iter()
            .map(|(name, gating)| PlanEntry {
                name: name.into(),
                gating,
                state: StageState::Pending,
                detail: None,
                elapsed: None,
            })
            .collect();
        Self {
            entries,
            aborted: None,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.stage.iter().map(|s| (s.name.clone(), s.gating)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state_of(&self, name: &str) -> Option<StageState> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.state)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Index of the next stage to start, or `None` when the pipeline is done
    /// (every stage decided, or aborted).
    pub fn next_stage(&self) -> Option<usize> {
        if self.aborted.is_some() {
            return None;
        }
        if self.entries.iter().any(|e| e.state == StageState::Running) {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.state == StageState::Pending)
    }

    pub fn mark_running(&mut self, idx: usize) {
        if let Some(entry) = self.entries.get_mut(idx) {
            debug!(stage = %entry.name, "stage running");
            entry.state = StageState::Running;
        }
    }

    /// Record how a running stage ended.
    ///
    /// A failed gating stage aborts the pipeline: every stage still pending
    /// is marked skipped. A failed non-gating stage only degrades the run.
    pub fn record_outcome(
        &mut self,
        idx: usize,
        succeeded: bool,
        detail: impl Into<String>,
        elapsed: Duration,
    ) {
        let Some(entry) = self.entries.get_mut(idx) else {
            return;
        };
        entry.state = if succeeded {
            StageState::Succeeded
        } else {
            StageState::Failed
        };
        entry.detail = Some(detail.into());
        entry.elapsed = Some(elapsed);

        if succeeded {
            info!(stage = %entry.name, ?elapsed, "stage succeeded");
            return;
        }

        if entry.gating {
            warn!(stage = %entry.name, "gating stage failed; aborting pipeline");
            let reason = format!("gating stage '{}' failed", entry.name);
            self.abort(reason);
        } else {
            warn!(stage = %entry.name, "non-gating stage failed; continuing degraded");
        }
    }

    /// Stop the pipeline: running stages fail, pending ones are skipped.
    pub fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        for entry in &mut self.entries {
            match entry.state {
                StageState::Pending => {
                    entry.state = StageState::Skipped;
                    entry.detail = Some(format!("skipped: {reason}"));
                }
                StageState::Running => {
                    entry.state = StageState::Failed;
                    entry.detail = Some(reason.clone());
                }
                _ => {}
            }
        }
        if self.aborted.is_none() {
            self.aborted = Some(reason);
        }
    }

    /// True when every gating stage succeeded.
    pub fn overall(&self) -> bool {
        self.entries
            .iter()
            .filter(|e| e.gating)
            .all(|e| e.state == StageState::Succeeded)
    }

    /// True when some non-gating stage did not succeed.
    pub fn degraded(&self) -> bool {
        self.entries
            .iter()
            .any(|e| !e.gating && matches!(e.state, StageState::Failed))
    }

    pub fn report(&self) -> PipelineReport {
        let stages = self
            .entries
            .iter()
            .map(|e| {
                StageReport::new(
                    e.name.clone(),
                    e.gating,
                    e.state,
                    e.detail.clone(),
                    e.elapsed.map(|d| d.as_millis() as u64),
                )
            })
            .collect();

        PipelineReport::new(stages, self.degraded(), self.overall(), self.aborted.clone())
    }
}
