// src/pipeline/executor.rs

//! Pluggable stage executor abstraction.
//!
//! The orchestrator talks to a [`StageExecutor`] instead of spawning
//! processes itself. [`RealStageExecutor`] supervises real child processes
//! and gates on their snapshots; tests can provide their own implementation
//! that decides stage outcomes directly.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::{ConfigSection, StageConfig};
use crate::ready::{ReadinessPredicate, ReadinessWaiter};
use crate::record::{spawn_recorder, LogRecorder};
use crate::store::StatusStore;
use crate::supervise::{
    request_shutdown, CommandSpec, ExitOutcome, Interrupt, ProcessSupervisor, ShutdownSender,
};

/// Extra time, on top of the shutdown grace, that teardown waits for a
/// supervisor to write its final snapshot.
const TEARDOWN_SLACK: Duration = Duration::from_secs(2);

/// What the orchestrator learns about one executed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub succeeded: bool,
    pub detail: String,
    /// The stage ended because of an external interrupt.
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Trait abstracting how a stage is executed.
pub trait StageExecutor: Send {
    /// Run `stage` until its outcome is known.
    ///
    /// The process behind a stage may keep running after this resolves
    /// (a dev server that became ready); [`shutdown`](Self::shutdown) stops
    /// whatever is left.
    fn execute<'a>(
        &'a mut self,
        stage: &'a StageConfig,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>>;

    /// An interrupt received so far, if any.
    fn interrupted(&self) -> Option<Interrupt>;

    /// Stop every process still running and wait for its final write.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

struct ActiveStage {
    name: String,
    handle: JoinHandle<ExitOutcome>,
}

/// Executor used in production: one [`ProcessSupervisor`] plus one
/// [`ReadinessWaiter`] per stage.
pub struct RealStageExecutor {
    store: StatusStore,
    waiter: ReadinessWaiter,
    shutdown_tx: ShutdownSender,
    shutdown_grace: Duration,
    echo: bool,
    active: Vec<ActiveStage>,
}

impl RealStageExecutor {
    pub fn new(store: StatusStore, settings: &ConfigSection, shutdown: ShutdownSender) -> Self {
        let waiter = ReadinessWaiter::new(store.clone(), settings.poll_interval);
        Self {
            store,
            waiter,
            shutdown_tx: shutdown,
            shutdown_grace: settings.shutdown_grace,
            echo: settings.echo_output,
            active: Vec::new(),
        }
    }

    async fn run_stage(&mut self, stage: &StageConfig) -> StageResult {
        let started = Instant::now();

        let predicate = match ReadinessPredicate::from_stage(stage) {
            Ok(p) => p,
            Err(e) => {
                return StageResult {
                    succeeded: false,
                    detail: e.to_string(),
                    interrupted: false,
                    elapsed: started.elapsed(),
                };
            }
        };

        let recorder = LogRecorder::start(&stage.name, self.store.clone());
        let (recorder, _recorder_join) = spawn_recorder(recorder);
        let supervisor = ProcessSupervisor::new(recorder, self.shutdown_grace, self.echo);
        let command = CommandSpec::from_stage(stage);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let mut process = tokio::spawn(async move { supervisor.run(&command, shutdown_rx).await });

        info!(
            stage = %stage.name,
            ready_when = %predicate.describe(),
            timeout = ?stage.timeout,
            "waiting for stage readiness"
        );

        let waiter = self.waiter.clone();
        let name = stage.name.clone();
        let ready_delay = stage.ready_delay;
        let budget = stage.timeout;
        let gate = {
            let predicate = predicate.clone();
            async move {
                if let Some(delay) = ready_delay {
                    sleep(delay).await;
                }
                waiter
                    .wait_until(&name, |snapshot| predicate.matches(snapshot), budget)
                    .await
            }
        };

        tokio::select! {
            ready = gate => {
                // The process keeps running; teardown stops it.
                self.active.push(ActiveStage { name: stage.name.clone(), handle: process });
                let detail = if ready {
                    format!("ready ({})", predicate.describe())
                } else {
                    format!("not ready within {:?} ({})", budget, predicate.describe())
                };
                StageResult { succeeded: ready, detail, interrupted: false, elapsed: started.elapsed() }
            }
            joined = &mut process => {
                // Finished before the gate decided: the snapshot is final, so
                // one more look settles it.
                let outcome = joined.unwrap_or_else(|e| {
                    warn!(stage = %stage.name, error = %e, "supervisor task failed");
                    ExitOutcome::Exited { code: -1 }
                });
                let ready = self.waiter.check(&stage.name, |snapshot| predicate.matches(snapshot));
                let interrupted = matches!(outcome, ExitOutcome::Interrupted { .. });
                let detail = if ready {
                    format!("ready ({}); process {}", predicate.describe(), outcome)
                } else {
                    format!("process {} before becoming ready ({})", outcome, predicate.describe())
                };
                StageResult {
                    succeeded: ready && !interrupted,
                    detail,
                    interrupted,
                    elapsed: started.elapsed(),
                }
            }
        }
    }

    async fn stop_all(&mut self) {
        if self.active.is_empty() {
            return;
        }

        request_shutdown(&self.shutdown_tx, Interrupt::Terminate);

        for stage in self.active.drain(..) {
            let name = stage.name;
            match timeout(self.shutdown_grace.saturating_add(TEARDOWN_SLACK), stage.handle).await {
                Ok(Ok(outcome)) => debug!(stage = %name, %outcome, "stage process stopped"),
                Ok(Err(e)) => warn!(stage = %name, error = %e, "supervisor task failed during teardown"),
                Err(_) => warn!(stage = %name, "supervisor did not stop in time"),
            }
        }
    }
}

impl StageExecutor for RealStageExecutor {
    fn execute<'a>(
        &'a mut self,
        stage: &'a StageConfig,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>> {
        Box::pin(self.run_stage(stage))
    }

    fn interrupted(&self) -> Option<Interrupt> {
        *self.shutdown_tx.borrow()
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.stop_all())
    }
}
