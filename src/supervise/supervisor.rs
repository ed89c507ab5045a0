// src/supervise/supervisor.rs

//! Runs one child process and feeds everything it does into a recorder.

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::record::{Level, RecorderHandle, StreamSource};

use super::command::CommandSpec;
use super::signals::{forward_to_child, wait_for_interrupt, Interrupt, ShutdownReceiver};
use super::streams::spawn_stream_reader;

/// How long stream readers get to drain after the child has exited. A
/// grandchild holding the pipes open must not stall finalization.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child exited on its own. `-1` when no code is available (killed
    /// by a signal).
    Exited { code: i32 },
    /// The child could not be launched at all.
    SpawnFailed { message: String },
    /// An interrupt was forwarded and the child has stopped. `code` is
    /// `None` when the child died from a signal or had to be killed.
    Interrupted {
        signal: Interrupt,
        code: Option<i32>,
    },
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Exited { code: 0 })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited { code } => Some(*code),
            ExitOutcome::SpawnFailed { .. } => None,
            ExitOutcome::Interrupted { code, .. } => *code,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited { code } => write!(f, "exited with code {code}"),
            ExitOutcome::SpawnFailed { message } => write!(f, "failed to start: {message}"),
            ExitOutcome::Interrupted { signal, .. } => write!(f, "interrupted by {signal}"),
        }
    }
}

/// Supervises a single stage's child process.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    recorder: RecorderHandle,
    shutdown_grace: Duration,
    echo: bool,
}

impl ProcessSupervisor {
    pub fn new(recorder: RecorderHandle, shutdown_grace: Duration, echo: bool) -> Self {
        Self {
            recorder,
            shutdown_grace,
            echo,
        }
    }

    /// Spawn `command`, stream its output into the recorder and finalize the
    /// snapshot however the run ends.
    ///
    /// Never returns an error: spawn failures and crashes become error
    /// entries plus the matching [`ExitOutcome`].
    pub async fn run(&self, command: &CommandSpec, mut shutdown: ShutdownReceiver) -> ExitOutcome {
        let stage = self.recorder.name().to_string();
        info!(stage = %stage, cmd = %command.display(), "starting process");

        let mut child = match command.to_command().spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!("Process error: {}", describe_spawn_error(&e, command));
                error!(stage = %stage, error = %e, "failed to spawn process");
                self.recorder.lifecycle(Level::Error, message.clone()).await;
                self.recorder.finish(None).await;
                return ExitOutcome::SpawnFailed { message };
            }
        };

        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stream_reader(
                stdout,
                StreamSource::Stdout,
                self.recorder.clone(),
                self.echo,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_stream_reader(
                stderr,
                StreamSource::Stderr,
                self.recorder.clone(),
                self.echo,
            ));
        }

        // Either the process exits on its own, or an interrupt arrives and
        // is passed on to it.
        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => ExitOutcome::Exited { code: exit_code_of(&status) },
                Err(e) => {
                    warn!(stage = %stage, error = %e, "failed to wait for process");
                    self.recorder
                        .lifecycle(Level::Error, format!("Process error: {e}"))
                        .await;
                    ExitOutcome::Exited { code: -1 }
                }
            },
            signal = wait_for_interrupt(&mut shutdown) => {
                let code = self.stop_child(&stage, &mut child, signal).await;
                ExitOutcome::Interrupted { signal, code }
            }
        };

        drain_readers(&stage, readers).await;
        self.record_outcome(&outcome).await;

        info!(stage = %stage, outcome = %outcome, "process finished");
        outcome
    }

    /// Forward `signal`, give the child `shutdown_grace` to exit, then kill.
    async fn stop_child(&self, stage: &str, child: &mut Child, signal: Interrupt) -> Option<i32> {
        info!(stage, %signal, "forwarding signal to child process");
        if let Err(e) = forward_to_child(child, signal) {
            warn!(stage, %signal, error = %e, "failed to forward signal to child");
        }

        match timeout(self.shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => {
                warn!(stage, error = %e, "failed to wait for interrupted child");
                None
            }
            Err(_) => {
                warn!(
                    stage,
                    grace = ?self.shutdown_grace,
                    "child ignored signal within grace period; killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(stage, error = %e, "failed to kill child process");
                }
                None
            }
        }
    }

    async fn record_outcome(&self, outcome: &ExitOutcome) {
        match outcome {
            ExitOutcome::Exited { code } => {
                let level = if *code == 0 { Level::Success } else { Level::Error };
                self.recorder
                    .lifecycle(level, format!("Process exited with code {code}"))
                    .await;
            }
            ExitOutcome::Interrupted { signal, code } => {
                let message = match code {
                    Some(code) => format!("Stopped by {signal}; process exited with code {code}"),
                    None => format!("Stopped by {signal}; process terminated"),
                };
                self.recorder.lifecycle(Level::Info, message).await;
            }
            ExitOutcome::SpawnFailed { .. } => {}
        }
        self.recorder.finish(outcome.exit_code()).await;
    }
}

async fn drain_readers(stage: &str, readers: Vec<JoinHandle<()>>) {
    for reader in readers {
        match timeout(READER_DRAIN_TIMEOUT, reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(stage, error = %e, "stream reader task failed"),
            Err(_) => debug!(stage, "stream still open after exit; not waiting for it"),
        }
    }
}

fn exit_code_of(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn describe_spawn_error(e: &std::io::Error, command: &CommandSpec) -> String {
    match e.kind() {
        std::io::ErrorKind::NotFound => {
            format!("'{}' is not recognized as a command (not found)", command.program)
        }
        std::io::ErrorKind::PermissionDenied => {
            format!("permission denied launching '{}'", command.program)
        }
        _ => format!("spawning '{}' failed: {}", command.program, e),
    }
}
