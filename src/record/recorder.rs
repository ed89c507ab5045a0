// src/record/recorder.rs

//! Per-stage log recorder.
//!
//! [`LogRecorder`] is a plain synchronous state machine: it owns the log
//! sequence, derives the summary and status, and writes a snapshot through
//! the [`StatusStore`] after every change.
//!
//! [`spawn_recorder`] wraps it in a single-owner actor so that concurrent
//! stream readers can feed it without ever mutating the snapshot at the same
//! time. The actor runs on Tokio's blocking pool because every event ends in
//! a synchronous file write.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::StatusStore;

use super::classify::{classify, status_hint};
use super::entry::{now, Level, LogEntry, Status, StatusSnapshot, StreamSource, Summary};

/// Accumulates classified entries for one stage.
#[derive(Debug)]
pub struct LogRecorder {
    name: String,
    store: StatusStore,
    start_time: DateTime<Utc>,
    status: Status,
    logs: Vec<LogEntry>,
    summary: Summary,
    exit_code: Option<i32>,
    finished: bool,
    /// The last persistence attempt failed; the next change retries it.
    dirty: bool,
    /// Final snapshot, as written by `finish`.
    sealed: Option<StatusSnapshot>,
}

impl LogRecorder {
    /// Begin a fresh stage: `starting`, no logs. Any previous snapshot under
    /// the same name is replaced right away.
    pub fn start(name: impl Into<String>, store: StatusStore) -> Self {
        let mut recorder = Self {
            name: name.into(),
            store,
            start_time: now(),
            status: Status::Starting,
            logs: Vec::new(),
            summary: Summary::default(),
            exit_code: None,
            finished: false,
            dirty: false,
            sealed: None,
        };
        recorder.persist();
        recorder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Classify a chunk of child output and record it, trimmed.
    ///
    /// Blank text is kept as an empty `info` entry. Returns `None` once
    /// [`finish`](Self::finish) has run.
    pub fn append(&mut self, raw: &str, stream: StreamSource) -> Option<&LogEntry> {
        let message = raw.trim();
        let level = classify(message);
        self.push(level, message.to_string(), stream)
    }

    /// Record a lifecycle event with an explicit level, bypassing
    /// classification.
    pub fn record(
        &mut self,
        level: Level,
        message: impl Into<String>,
        stream: StreamSource,
    ) -> Option<&LogEntry> {
        self.push(level, message.into(), stream)
    }

    /// Seal the snapshot and return the one that was written. Later appends
    /// are ignored and later calls return the same snapshot.
    pub fn finish(&mut self, exit_code: Option<i32>) -> StatusSnapshot {
        if let Some(ref sealed) = self.sealed {
            return sealed.clone();
        }
        self.exit_code = exit_code;
        self.finished = true;
        let snapshot = self.persist();
        self.sealed = Some(snapshot.clone());
        snapshot
    }

    /// Current state as a persistable snapshot; the sealed one once finished.
    pub fn snapshot(&self) -> StatusSnapshot {
        if let Some(ref sealed) = self.sealed {
            return sealed.clone();
        }
        let timestamp = now();
        StatusSnapshot {
            timestamp,
            status: self.status,
            start_time: self.start_time,
            duration_ms: (timestamp - self.start_time).num_milliseconds(),
            logs: self.logs.clone(),
            summary: self.summary,
            exit_code: self.exit_code,
            finished: self.finished,
        }
    }

    fn push(&mut self, level: Level, message: String, stream: StreamSource) -> Option<&LogEntry> {
        if self.finished {
            debug!(stage = %self.name, %message, "recorder already finished; dropping entry");
            return None;
        }

        if let Some(hint) = status_hint(level, &message) {
            self.status = self.status.advance(hint);
        }

        self.logs.push(LogEntry {
            timestamp: now(),
            level,
            message,
            stream: Some(stream),
        });
        self.summary = Summary::from_logs(&self.logs);
        self.persist();

        self.logs.last()
    }

    fn persist(&mut self) -> StatusSnapshot {
        let snapshot = self.snapshot();
        match self.store.write(&self.name, &snapshot) {
            Ok(()) => {
                if self.dirty {
                    debug!(stage = %self.name, "snapshot persisted after earlier failure");
                }
                self.dirty = false;
            }
            Err(e) => {
                warn!(
                    stage = %self.name,
                    error = %e,
                    "failed to persist status snapshot; will retry on next update"
                );
                self.dirty = true;
            }
        }
        snapshot
    }
}

/// Messages accepted by the recorder actor.
#[derive(Debug)]
enum RecorderCommand {
    Output {
        text: String,
        stream: StreamSource,
    },
    Lifecycle {
        level: Level,
        message: String,
    },
    Finish {
        exit_code: Option<i32>,
        ack: oneshot::Sender<StatusSnapshot>,
    },
}

/// Cheap, cloneable handle to a running recorder actor.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    name: String,
    tx: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forward a chunk of child output.
    pub async fn output(&self, text: impl Into<String>, stream: StreamSource) {
        self.send(RecorderCommand::Output {
            text: text.into(),
            stream,
        })
        .await;
    }

    /// Record a supervisor lifecycle event.
    pub async fn lifecycle(&self, level: Level, message: impl Into<String>) {
        self.send(RecorderCommand::Lifecycle {
            level,
            message: message.into(),
        })
        .await;
    }

    /// Finalize the stage and wait until the final snapshot has been written.
    ///
    /// Returns `None` if the actor is already gone.
    pub async fn finish(&self, exit_code: Option<i32>) -> Option<StatusSnapshot> {
        let (ack, rx) = oneshot::channel();
        self.send(RecorderCommand::Finish { exit_code, ack }).await;
        rx.await.ok()
    }

    async fn send(&self, command: RecorderCommand) {
        if self.tx.send(command).await.is_err() {
            warn!(stage = %self.name, "recorder actor stopped; dropping event");
        }
    }
}

/// Move a recorder onto its own actor task.
///
/// The returned join handle resolves to the last snapshot once every handle
/// has been dropped.
pub fn spawn_recorder(mut recorder: LogRecorder) -> (RecorderHandle, JoinHandle<StatusSnapshot>) {
    let (tx, mut rx) = mpsc::channel::<RecorderCommand>(256);
    let handle = RecorderHandle {
        name: recorder.name().to_string(),
        tx,
    };

    let join = tokio::task::spawn_blocking(move || {
        debug!(stage = %recorder.name(), "recorder actor started");

        while let Some(command) = rx.blocking_recv() {
            match command {
                RecorderCommand::Output { text, stream } => {
                    recorder.append(&text, stream);
                }
                RecorderCommand::Lifecycle { level, message } => {
                    recorder.record(level, message, StreamSource::Supervisor);
                }
                RecorderCommand::Finish { exit_code, ack } => {
                    let _ = ack.send(recorder.finish(exit_code));
                }
            }
        }

        debug!(stage = %recorder.name(), "recorder actor finished (channel closed)");
        recorder.snapshot()
    });

    (handle, join)
}
