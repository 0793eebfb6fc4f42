use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events that can trigger workflow step state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Start executing the step
    Start,
    /// Mark step as succeeded with optional output
    Succeed(Option<Value>),
    /// Mark step as failed with error message
    Fail(String),
    /// Skip the step (branch not taken or join condition unmet)
    Skip,
    /// A predecessor failed
    UpstreamFail,
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Succeed(_) => "succeed",
            Self::Fail(_) => "fail",
            Self::Skip => "skip",
            Self::UpstreamFail => "upstream_fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Extract output if this is a success event
    pub fn output(&self) -> Option<&Value> {
        match self {
            Self::Succeed(output) => output.as_ref(),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }

    /// Create a success event carrying the step's output
    pub fn succeed_with_output(output: Value) -> Self {
        Self::Succeed(Some(output))
    }
}
