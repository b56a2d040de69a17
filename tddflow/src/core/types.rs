//! Shared deterministic types for the workflow core.
//!
//! These types define stable contracts between the controller, its states, and
//! the stores. They must not depend on external state or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateName {
    Idle,
    Plan,
    Dev,
    Review,
}

impl StateName {
    pub fn label(self) -> &'static str {
        match self {
            StateName::Idle => "IDLE",
            StateName::Plan => "PLAN",
            StateName::Dev => "DEV",
            StateName::Review => "REVIEW",
        }
    }

    /// Whether the workflow may move from `self` to `next`.
    pub fn can_transition_to(self, next: StateName) -> bool {
        matches!(
            (self, next),
            (StateName::Idle, StateName::Plan)
                | (StateName::Plan, StateName::Dev)
                | (StateName::Dev, StateName::Review)
                | (StateName::Review, StateName::Idle)
                | (StateName::Review, StateName::Dev)
        )
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// TDD sub-state, meaningful only while the workflow is in [`StateName::Dev`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TddPhase {
    #[default]
    Red,
    Green,
    Refactor,
}

impl TddPhase {
    pub fn label(self) -> &'static str {
        match self {
            TddPhase::Red => "RED",
            TddPhase::Green => "GREEN",
            TddPhase::Refactor => "REFACTOR",
        }
    }
}

impl fmt::Display for TddPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Planning,
    Developing,
    Reviewing,
    Completed,
}

impl SessionStatus {
    /// The workflow state a resumed session re-enters, if any.
    pub fn resume_state(self) -> Option<StateName> {
        match self {
            SessionStatus::Planning => Some(StateName::Plan),
            SessionStatus::Developing => Some(StateName::Dev),
            SessionStatus::Reviewing => Some(StateName::Review),
            SessionStatus::Completed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planning => "planning",
            SessionStatus::Developing => "developing",
            SessionStatus::Reviewing => "reviewing",
            SessionStatus::Completed => "completed",
        }
    }
}

/// A named unit of work from the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub is_done: bool,
}

impl Task {
    pub fn open(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_done: false,
        }
    }
}

/// Classified result of a test-command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Pass,
    Fail,
}

impl TestOutcome {
    pub fn passed(self) -> bool {
        self == TestOutcome::Pass
    }
}

/// Severity attached to host UI notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}
