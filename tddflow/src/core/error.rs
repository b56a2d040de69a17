//! Error taxonomy for workflow operations.
//!
//! Every variant is reported to the agent as a `FAILED:` tool response; none of
//! them terminate the controller.

use thiserror::Error;

use crate::core::types::StateName;

#[derive(Debug, Error)]
pub enum FlowError {
    /// The requested operation is not valid in the current workflow state.
    #[error("{0}")]
    GuardViolation(String),

    /// Blank, malformed, or unknown input.
    #[error("{0}")]
    InvalidInput(String),

    /// The human declined a confirmation.
    #[error("{0}")]
    UserRejection(String),

    /// A session operation ran without a persisted session.
    #[error("no active session found. Start a session first.")]
    NoActiveSession,

    /// A backing file could not be read or written.
    #[error("store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    /// The test command could not be run to completion.
    #[error("test command failed: {0}")]
    ExternalCommandFailure(String),
}

impl FlowError {
    /// Guard violation for an operation that requires `expected` but ran in `actual`.
    pub fn wrong_state(action: &str, expected: StateName, actual: Option<StateName>) -> Self {
        match actual {
            Some(actual) => FlowError::GuardViolation(format!(
                "you are only allowed to {action} in {expected} state, but you are currently in {actual} state"
            )),
            None => FlowError::not_running(),
        }
    }

    pub fn not_running() -> Self {
        FlowError::GuardViolation(
            "the flow is not running. Wait for the user to run start-flow or resume-flow."
                .to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_state_names_both_states() {
        let err = FlowError::wrong_state("select a task", StateName::Idle, Some(StateName::Dev));
        assert_eq!(
            err.to_string(),
            "you are only allowed to select a task in IDLE state, but you are currently in DEV state"
        );
    }

    #[test]
    fn wrong_state_without_active_flow_reports_not_running() {
        let err = FlowError::wrong_state("start development", StateName::Plan, None);
        assert!(err.to_string().contains("not running"));
    }
}
