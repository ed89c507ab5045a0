// src/pipeline/orchestrator.rs

use std::fmt;

use tracing::{info, warn};

use crate::config::{ConfigFile, StageConfig};

use super::executor::StageExecutor;
use super::plan::PipelinePlan;
use super::report::PipelineReport;

/// Runs stages one after another through a [`StageExecutor`].
///
/// This is the async shell around [`PipelinePlan`], which owns the gating
/// semantics. Whatever happens inside a stage, `run` always produces a
/// report.
pub struct Orchestrator<E: StageExecutor> {
    plan: PipelinePlan,
    stages: Vec<StageConfig>,
    executor: E,
}

impl<E: StageExecutor> fmt::Debug for Orchestrator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl<E: StageExecutor> Orchestrator<E> {
    pub fn new(cfg: &ConfigFile, executor: E) -> Self {
        Self {
            plan: PipelinePlan::from_config(cfg),
            stages: cfg.stage.clone(),
            executor,
        }
    }

    pub async fn run(mut self) -> PipelineReport {
        info!(stages = self.plan.len(), "pipeline started");

        while let Some(idx) = self.plan.next_stage() {
            if let Some(signal) = self.executor.interrupted() {
                warn!(%signal, "interrupt received; not starting further stages");
                self.plan.abort(format!("interrupted by {signal}"));
                break;
            }

            let stage = &self.stages[idx];
            info!(stage = %stage.name, cmd = %stage.display_command(), gating = stage.gating, "starting stage");
            self.plan.mark_running(idx);

            let result = self.executor.execute(stage).await;
            let interrupted = result.interrupted;
            self.plan
                .record_outcome(idx, result.succeeded, result.detail, result.elapsed);

            if interrupted {
                let reason = match self.executor.interrupted() {
                    Some(signal) => format!("interrupted by {signal}"),
                    None => "interrupted".to_string(),
                };
                self.plan.abort(reason);
            }
        }

        self.executor.shutdown().await;

        let report = self.plan.report();
        info!(overall = report.overall, degraded = report.degraded, "pipeline finished");
        report
    }
}
