use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devwatch::config::StageConfig;
use devwatch::pipeline::{StageExecutor, StageResult};
use devwatch::record::{LogRecorder, StreamSource};
use devwatch::store::StatusStore;
use devwatch::supervise::Interrupt;

/// Scripted outcome for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOutcome {
    Ready,
    NotReady,
    /// The stage ends because of an interrupt, which the executor then
    /// keeps reporting.
    Interrupted(Interrupt),
}

/// A fake executor that:
/// - records which stages were "run"
/// - answers each stage with its scripted outcome (ready by default)
/// - records whether teardown was requested
/// - optionally writes a snapshot from scripted output lines.
#[derive(Debug, Default)]
pub struct FakeStageExecutor {
    outcomes: HashMap<String, FakeOutcome>,
    output: HashMap<String, Vec<String>>,
    store: Option<StatusStore>,
    executed: Arc<Mutex<Vec<String>>>,
    shutdowns: Arc<Mutex<usize>>,
    interrupt: Option<Interrupt>,
}

impl FakeStageExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, stage: &str, outcome: FakeOutcome) -> Self {
        self.outcomes.insert(stage.to_string(), outcome);
        self
    }

    /// Where scripted output is recorded.
    pub fn with_store(mut self, store: StatusStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Lines the stage "prints"; recorded into a finished snapshot when a
    /// store is set. Stages without output leave no snapshot behind.
    pub fn with_output(mut self, stage: &str, lines: &[&str]) -> Self {
        self.output.insert(
            stage.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// Pretend an interrupt arrived before the pipeline started.
    pub fn interrupted_before_start(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Shared log of executed stage names, in order.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    /// Shared counter of `shutdown` calls.
    pub fn shutdowns(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.shutdowns)
    }
}

impl StageExecutor for FakeStageExecutor {
    fn execute<'a>(
        &'a mut self,
        stage: &'a StageConfig,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(stage.name.clone());

            let outcome = self
                .outcomes
                .get(&stage.name)
                .copied()
                .unwrap_or(FakeOutcome::Ready);

            let (succeeded, detail, interrupted) = match outcome {
                FakeOutcome::Ready => (true, "ready".to_string(), false),
                FakeOutcome::NotReady => (false, "not ready".to_string(), false),
                FakeOutcome::Interrupted(signal) => {
                    self.interrupt = Some(signal);
                    (false, format!("interrupted by {signal}"), true)
                }
            };

            if let (Some(store), Some(lines)) = (&self.store, self.output.get(&stage.name)) {
                let mut recorder = LogRecorder::start(&stage.name, store.clone());
                for line in lines {
                    recorder.append(line, StreamSource::Stdout);
                }
                recorder.finish(Some(if succeeded { 0 } else { 1 }));
            }

            StageResult {
                succeeded,
                detail,
                interrupted,
                elapsed: Duration::from_millis(1),
            }
        })
    }

    fn interrupted(&self) -> Option<Interrupt> {
        self.interrupt
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            *self.shutdowns.lock().unwrap() += 1;
        })
    }
}
