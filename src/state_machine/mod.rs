// State machine module for workflow steps
//
// Each step of a run moves through a small, explicit set of states. Transitions
// are pure functions of (state, event) so they can be validated without any
// orchestration runtime.

pub mod errors;
pub mod events;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::StepEvent;
pub use states::StepState;
pub use step_state_machine::{StepStateMachine, StepTransition};
