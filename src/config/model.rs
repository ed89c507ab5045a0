use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ReadinessCondition;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// status_dir = ".cursor"
/// poll_interval = "1s"
///
/// [[stage]]
/// name = "runtime"
/// cmd = "npm"
/// args = ["run", "dev"]
/// timeout = "30s"
/// ready_delay = "5s"
///
/// [[stage]]
/// name = "analysis"
/// cmd = "node"
/// args = ["tools/feedback-analyzer.js"]
/// ready_when = "exited"
/// gating = false
/// ```
///
/// This is the unvalidated form; use `ConfigFile::try_from` (or
/// [`crate::config::load_and_validate`]) to get a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Pipeline stages from `[[stage]]`, in execution order.
    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holders can rely on
/// unique stage names, non-empty commands and compilable patterns.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub stage: Vec<StageConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, stage: Vec<StageConfig>) -> Self {
        Self { config, stage }
    }

    /// Look up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&StageConfig> {
        self.stage.iter().find(|s| s.name == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory holding the `<stage>-log.json` snapshots.
    #[serde(default = "default_status_dir")]
    pub status_dir: PathBuf,

    /// How often readiness waiters re-read a snapshot.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "super::duration::deserialize"
    )]
    pub poll_interval: Duration,

    /// How long a child gets after a forwarded interrupt before it is killed.
    #[serde(
        default = "default_shutdown_grace",
        deserialize_with = "super::duration::deserialize"
    )]
    pub shutdown_grace: Duration,

    /// Echo child output lines to the terminal, prefixed with the stage name.
    #[serde(default = "default_true")]
    pub echo_output: bool,
}

pub fn default_status_dir() -> PathBuf {
    PathBuf::from(".cursor")
}

pub fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

pub fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            status_dir: default_status_dir(),
            poll_interval: default_poll_interval(),
            shutdown_grace: default_shutdown_grace(),
            echo_output: true,
        }
    }
}

/// One `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Stage name; also names the snapshot file.
    pub name: String,

    /// Program to run (or the full command line when `shell = true`).
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Run `cmd` through `sh -c` (`cmd /C` on Windows).
    #[serde(default)]
    pub shell: bool,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// A failed gating stage aborts every later stage.
    #[serde(default = "default_true")]
    pub gating: bool,

    /// Readiness budget for this stage.
    #[serde(
        default = "default_stage_timeout",
        deserialize_with = "super::duration::deserialize"
    )]
    pub timeout: Duration,

    /// Grace period before the first readiness poll.
    #[serde(default, deserialize_with = "super::duration::deserialize_opt")]
    pub ready_delay: Option<Duration>,

    #[serde(default)]
    pub ready_when: ReadinessCondition,

    /// Regex that, when matched by any log message, also counts as ready.
    #[serde(default)]
    pub ready_pattern: Option<String>,
}

pub fn default_stage_timeout() -> Duration {
    Duration::from_secs(60)
}

impl StageConfig {
    /// The command line as shown to humans.
    pub fn display_command(&self) -> String {
        if self.args.is_empty() {
            self.cmd.clone()
        } else {
            format!("{} {}", self.cmd, self.args.join(" "))
        }
    }
}
