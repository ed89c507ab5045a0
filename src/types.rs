use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a stage has to show in its snapshot before the pipeline treats it as
/// ready.
///
/// - `Compiled`: some log line mentions a build completion (default).
/// - `Healthy`: no errors so far and at least one success line.
/// - `Exited`: the process exited with code 0.
/// - `Success`: the stage status is currently `success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessCondition {
    #[default]
    Compiled,
    Healthy,
    Exited,
    Success,
}

impl FromStr for ReadinessCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compiled" => Ok(ReadinessCondition::Compiled),
            "healthy" => Ok(ReadinessCondition::Healthy),
            "exited" => Ok(ReadinessCondition::Exited),
            "success" => Ok(ReadinessCondition::Success),
            other => Err(format!(
                "invalid readiness condition: {other} (expected \"compiled\", \"healthy\", \"exited\" or \"success\")"
            )),
        }
    }
}

impl fmt::Display for ReadinessCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadinessCondition::Compiled => "compiled",
            ReadinessCondition::Healthy => "healthy",
            ReadinessCondition::Exited => "exited",
            ReadinessCondition::Success => "success",
        };
        f.write_str(s)
    }
}
