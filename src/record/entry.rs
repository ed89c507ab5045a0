// src/record/entry.rs

//! Log entries and the snapshot shape persisted for each stage.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Current time truncated to milliseconds, the precision snapshots carry.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Severity of a single log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Success => "success",
        };
        f.write_str(s)
    }
}

/// Where a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
    /// Lifecycle events generated by the supervisor itself.
    Supervisor,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
            StreamSource::Supervisor => "supervisor",
        };
        f.write_str(s)
    }
}

/// One classified line of output. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamSource>,
}

/// Stage status as seen by snapshot consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Starting,
    Building,
    Success,
    Warning,
    Error,
}

impl Status {
    /// Position in the forward-only order
    /// `starting < building < success < warning < error`.
    pub fn rank(self) -> u8 {
        match self {
            Status::Starting => 0,
            Status::Building => 1,
            Status::Success => 2,
            Status::Warning => 3,
            Status::Error => 4,
        }
    }

    /// Move towards `candidate` only if it ranks higher than `self`.
    pub fn advance(self, candidate: Status) -> Status {
        if candidate.rank() > self.rank() {
            candidate
        } else {
            self
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Starting => "starting",
            Status::Building => "building",
            Status::Success => "success",
            Status::Warning => "warning",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Aggregate view over a stage's log sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_logs: usize,
    pub error_count: usize,
    pub success_count: usize,
    pub warning_count: usize,
    pub is_healthy: bool,
    pub has_compiled: bool,
}

impl Summary {
    /// Derive the summary from a log sequence.
    pub fn from_logs(logs: &[LogEntry]) -> Self {
        let mut summary = Summary {
            total_logs: logs.len(),
            ..Summary::default()
        };

        for entry in logs {
            match entry.level {
                Level::Error => summary.error_count += 1,
                Level::Success => summary.success_count += 1,
                Level::Warning => summary.warning_count += 1,
                Level::Info => {}
            }
            if !summary.has_compiled && super::classify::mentions_build_completion(&entry.message) {
                summary.has_compiled = true;
            }
        }

        summary.is_healthy = summary.error_count == 0 && summary.success_count > 0;
        summary
    }
}

/// Full persisted status record of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_ms: i64,
    pub logs: Vec<LogEntry>,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub finished: bool,
}

impl StatusSnapshot {
    /// One human-readable line, e.g. for `devwatch status`.
    pub fn describe(&self) -> String {
        let s = &self.summary;
        let mut line = format!(
            "status={} logs={} errors={} warnings={} successes={} healthy={} compiled={} duration={}ms",
            self.status,
            s.total_logs,
            s.error_count,
            s.warning_count,
            s.success_count,
            s.is_healthy,
            s.has_compiled,
            self.duration_ms
        );
        match (self.finished, self.exit_code) {
            (true, Some(code)) => line.push_str(&format!(" exited={code}")),
            (true, None) => line.push_str(" finished"),
            (false, _) => line.push_str(" running"),
        }
        line
    }
}
