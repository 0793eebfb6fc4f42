use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepState,
};

/// One recorded state change of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTransition {
    pub from_state: StepState,
    pub to_state: StepState,
    pub event: String,
    pub error_message: Option<String>,
    pub transitioned_at: DateTime<Utc>,
}

/// In-memory state machine for a single step of one run
#[derive(Debug, Clone)]
pub struct StepStateMachine {
    step_id: String,
    state: StepState,
    output: Option<Value>,
    transitions: Vec<StepTransition>,
}

impl StepStateMachine {
    /// Create a new step state machine in the pending state
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            state: StepState::default(),
            output: None,
            transitions: Vec::new(),
        }
    }

    /// Attempt to transition the step state, recording the change
    pub fn transition(
        &mut self,
        event: StepEvent,
        at: DateTime<Utc>,
    ) -> StateMachineResult<StepState> {
        let target_state = self.determine_target_state(self.state, &event)?;

        self.transitions.push(StepTransition {
            from_state: self.state,
            to_state: target_state,
            event: event.event_type().to_string(),
            error_message: event.error_message().map(str::to_string),
            transitioned_at: at,
        });

        if let StepEvent::Succeed(output) = event {
            self.output = output;
        }
        self.state = target_state;

        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        &self,
        current_state: StepState,
        event: &StepEvent,
    ) -> StateMachineResult<StepState> {
        if current_state.is_terminal() {
            return Err(StateMachineError::AlreadyTerminal {
                step: self.step_id.clone(),
                state: current_state.to_string(),
            });
        }

        let target = match (current_state, event) {
            (StepState::Pending, StepEvent::Start) => StepState::Running,
            (StepState::Pending, StepEvent::Skip) => StepState::Skipped,
            (StepState::Pending, StepEvent::UpstreamFail) => StepState::UpstreamFailed,
            (StepState::Pending, StepEvent::Fail(_)) => StepState::Failed,

            (StepState::Running, StepEvent::Succeed(_)) => StepState::Success,
            (StepState::Running, StepEvent::Fail(_)) => StepState::Failed,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    step: self.step_id.clone(),
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn current_state(&self) -> StepState {
        self.state
    }

    /// Output recorded by the success transition, if any
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn transitions(&self) -> &[StepTransition] {
        &self.transitions
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
