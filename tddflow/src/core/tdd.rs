//! TDD gate rules and phase transitions.
//!
//! Phases only move on test outcomes: Red→Green on a failing run,
//! Green→Refactor on a passing run. A passing run in Refactor completes the
//! cycle without changing phase.

use crate::core::classifier::PathKind;
use crate::core::types::{TddPhase, TestOutcome};

/// Reason to block a write to a path of `kind` during `phase`, if any.
pub fn write_block_reason(phase: TddPhase, kind: PathKind) -> Option<String> {
    match (phase, kind) {
        (TddPhase::Red, PathKind::Src) => Some(
            "In RED TDD phase, you are only allowed to edit the test folder and not the src folder. Write a failing test first."
                .to_string(),
        ),
        (TddPhase::Green | TddPhase::Refactor, PathKind::Test) => Some(format!(
            "In {phase} TDD phase, you are only allowed to edit the src folder and not the test folder."
        )),
        _ => None,
    }
}

/// Result of feeding one test outcome into the phase machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStep {
    /// Phase the test ran in.
    pub from: TddPhase,
    /// Phase after the outcome is applied.
    pub next: TddPhase,
    /// Guidance for the agent.
    pub guidance: &'static str,
    /// Refactor passed: the cycle is done and auto-runs may be suspended.
    pub cycle_complete: bool,
}

pub fn advance(phase: TddPhase, outcome: TestOutcome) -> PhaseStep {
    let (next, guidance, cycle_complete) = match (phase, outcome) {
        (TddPhase::Red, TestOutcome::Pass) => (
            TddPhase::Red,
            "Tests should fail in RED phase. If they're not failing for the right reasons, adjust your test.",
            false,
        ),
        (TddPhase::Red, TestOutcome::Fail) => (
            TddPhase::Green,
            "Tests are now failing as expected. Phase advances to GREEN - implement the minimum code to make tests pass.",
            false,
        ),
        (TddPhase::Green, TestOutcome::Fail) => (
            TddPhase::Green,
            "Tests are failing. Continue implementing until all tests pass.",
            false,
        ),
        (TddPhase::Green, TestOutcome::Pass) => (
            TddPhase::Refactor,
            "Tests are passing! Phase advances to REFACTOR - improve code quality without breaking tests.",
            false,
        ),
        (TddPhase::Refactor, TestOutcome::Fail) => (
            TddPhase::Refactor,
            "Tests broke during refactor! Fix the code to restore green tests.",
            false,
        ),
        (TddPhase::Refactor, TestOutcome::Pass) => (
            TddPhase::Refactor,
            "Tests still passing after refactor! Ready for the next RED cycle. If you are DONE with refactoring reply with [DONE].",
            true,
        ),
    };
    PhaseStep {
        from: phase,
        next,
        guidance,
        cycle_complete,
    }
}
