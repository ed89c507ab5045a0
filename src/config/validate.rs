use std::collections::HashSet;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DevwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.stage))
    }
}

/// Run every semantic check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_stages(cfg)?;
    validate_global_config(cfg)?;
    validate_stage_names(cfg)?;
    validate_stage_commands(cfg)?;
    Ok(())
}

fn ensure_has_stages(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(DevwatchError::ConfigError(
            "config must contain at least one [[stage]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.poll_interval.is_zero() {
        return Err(DevwatchError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }

    if cfg.config.status_dir.as_os_str().is_empty() {
        return Err(DevwatchError::ConfigError(
            "[config].status_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_stage_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for stage in &cfg.stage {
        check_stage_name(&stage.name)?;
        if !seen.insert(stage.name.as_str()) {
            return Err(DevwatchError::ConfigError(format!(
                "duplicate stage name '{}'",
                stage.name
            )));
        }
    }
    Ok(())
}

/// Stage names end up in file names, so keep them to a safe alphabet.
pub fn check_stage_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DevwatchError::ConfigError(
            "stage name must not be empty".to_string(),
        ));
    }

    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(DevwatchError::ConfigError(format!(
            "stage name '{}' may only contain ASCII letters, digits, '-' and '_'",
            name
        )));
    }

    Ok(())
}

fn validate_stage_commands(cfg: &RawConfigFile) -> Result<()> {
    for stage in &cfg.stage {
        if stage.cmd.trim().is_empty() {
            return Err(DevwatchError::ConfigError(format!(
                "stage '{}' has an empty `cmd`",
                stage.name
            )));
        }

        if stage.timeout.is_zero() {
            return Err(DevwatchError::ConfigError(format!(
                "stage '{}' must have a non-zero `timeout`",
                stage.name
            )));
        }

        if let Some(ref pattern) = stage.ready_pattern {
            Regex::new(pattern).map_err(|e| {
                DevwatchError::ConfigError(format!(
                    "stage '{}' has an invalid `ready_pattern` {:?}: {}",
                    stage.name, pattern, e
                ))
            })?;
        }
    }
    Ok(())
}
