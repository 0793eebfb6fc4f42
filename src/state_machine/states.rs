use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow step state definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Initial state, predecessors not yet resolved
    #[default]
    Pending,
    /// Step is currently being executed
    Running,
    /// Step completed successfully
    Success,
    /// Step was not selected by a branch or its join condition was not met
    Skipped,
    /// Step failed with an error
    Failed,
    /// A predecessor failed so the step never ran
    UpstreamFailed,
}

impl StepState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Skipped | Self::Failed | Self::UpstreamFailed
        )
    }

    /// Check if this is a failure, either own or inherited
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::UpstreamFailed)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::UpstreamFailed => write!(f, "upstream_failed"),
        }
    }
}

impl std::str::FromStr for StepState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "skipped" => Ok(Self::Skipped),
            "failed" => Ok(Self::Failed),
            "upstream_failed" => Ok(Self::UpstreamFailed),
            _ => Err(format!("Invalid step state: {s}")),
        }
    }
}
