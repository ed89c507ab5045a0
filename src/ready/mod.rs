// src/ready/mod.rs

//! Readiness detection by polling stage snapshots.

use std::time::Duration;

use regex::Regex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::StageConfig;
use crate::errors::{DevwatchError, Result};
use crate::record::{Status, StatusSnapshot};
use crate::store::StatusStore;
use crate::types::ReadinessCondition;

/// Compiled readiness test for one stage.
///
/// Holds when the condition holds, or when `pattern` matches any logged
/// message.
#[derive(Debug, Clone)]
pub struct ReadinessPredicate {
    condition: ReadinessCondition,
    pattern: Option<Regex>,
}

impl ReadinessPredicate {
    pub fn new(condition: ReadinessCondition, pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    DevwatchError::ConfigError(format!("invalid readiness pattern {p:?}: {e}"))
                })
            })
            .transpose()?;
        Ok(Self { condition, pattern })
    }

    pub fn from_stage(stage: &StageConfig) -> Result<Self> {
        Self::new(stage.ready_when, stage.ready_pattern.as_deref())
    }

    pub fn matches(&self, snapshot: &StatusSnapshot) -> bool {
        let by_condition = match self.condition {
            ReadinessCondition::Compiled => snapshot.summary.has_compiled,
            ReadinessCondition::Healthy => snapshot.summary.is_healthy,
            ReadinessCondition::Exited => snapshot.finished && snapshot.exit_code == Some(0),
            ReadinessCondition::Success => snapshot.status == Status::Success,
        };

        by_condition
            || self
                .pattern
                .as_ref()
                .is_some_and(|re| snapshot.logs.iter().any(|e| re.is_match(&e.message)))
    }

    pub fn describe(&self) -> String {
        match &self.pattern {
            Some(re) => format!("{} or /{}/", self.condition, re.as_str()),
            None => self.condition.to_string(),
        }
    }
}

/// Polls a [`StatusStore`] until a predicate holds or the budget runs out.
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    store: StatusStore,
    poll_interval: Duration,
}

impl ReadinessWaiter {
    pub fn new(store: StatusStore, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// One-shot check against the current snapshot.
    pub fn check<F>(&self, name: &str, predicate: F) -> bool
    where
        F: Fn(&StatusSnapshot) -> bool,
    {
        self.store.read(name).is_some_and(|snapshot| predicate(&snapshot))
    }

    /// Wait until `predicate` holds for the snapshot of `name`.
    ///
    /// Returns `false` once `timeout` has elapsed. The final sleep is clamped
    /// to the remaining budget, so a negative answer never arrives before
    /// `timeout` nor later than `timeout + poll_interval`. Missing or
    /// malformed snapshots simply count as "not ready yet".
    pub async fn wait_until<F>(&self, name: &str, predicate: F, timeout: Duration) -> bool
    where
        F: Fn(&StatusSnapshot) -> bool,
    {
        let started = Instant::now();
        debug!(stage = name, ?timeout, "waiting for readiness");

        loop {
            if self.check(name, &predicate) {
                info!(stage = name, elapsed = ?started.elapsed(), "stage is ready");
                return true;
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(stage = name, ?timeout, "timed out waiting for readiness");
                return false;
            }

            sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }
}
