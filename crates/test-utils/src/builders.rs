#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use devwatch::config::model::default_stage_timeout;
use devwatch::config::{ConfigFile, ConfigSection, RawConfigFile, StageConfig};
use devwatch::types::ReadinessCondition;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                stage: Vec::new(),
            },
        }
    }

    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.config.stage.push(stage);
        self
    }

    pub fn status_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.config.status_dir = dir.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.config.poll_interval = interval;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.config.shutdown_grace = grace;
        self
    }

    pub fn echo_output(mut self, echo: bool) -> Self {
        self.config.config.echo_output = echo;
        self
    }

    /// The unvalidated form, for validation tests.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    pub fn new(name: &str, cmd: &str) -> Self {
        Self {
            stage: StageConfig {
                name: name.to_string(),
                cmd: cmd.to_string(),
                args: Vec::new(),
                shell: false,
                cwd: None,
                gating: true,
                timeout: default_stage_timeout(),
                ready_delay: None,
                ready_when: ReadinessCondition::default(),
                ready_pattern: None,
            },
        }
    }

    /// A stage whose `cmd` is one `sh -c` line.
    pub fn shell(name: &str, line: &str) -> Self {
        let mut builder = Self::new(name, line);
        builder.stage.shell = true;
        builder
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.stage.args.push(arg.to_string());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stage.cwd = Some(dir.into());
        self
    }

    pub fn gating(mut self, val: bool) -> Self {
        self.stage.gating = val;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.stage.timeout = timeout;
        self
    }

    pub fn ready_delay(mut self, delay: Duration) -> Self {
        self.stage.ready_delay = Some(delay);
        self
    }

    pub fn ready_when(mut self, condition: ReadinessCondition) -> Self {
        self.stage.ready_when = condition;
        self
    }

    pub fn ready_pattern(mut self, pattern: &str) -> Self {
        self.stage.ready_pattern = Some(pattern.to_string());
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
