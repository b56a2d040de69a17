//! Write gating and post-edit test runs for the Dev state.

use tracing::{info, warn};

use crate::core::classifier::PathRules;
use crate::core::events::ToolDecision;
use crate::core::tdd::{self, PhaseStep};
use crate::core::types::{TddPhase, TestOutcome};
use crate::io::test_runner::{OutcomeClassifier, TestRequest, TestRun, TestRunner};

/// One completed post-edit test run.
#[derive(Debug, Clone)]
pub struct GateRun {
    pub run: TestRun,
    pub outcome: TestOutcome,
    pub step: PhaseStep,
}

pub struct TddGate {
    phase: TddPhase,
    edit_pending: bool,
    awaiting_ack: bool,
    rules: PathRules,
    request: TestRequest,
    runner: Box<dyn TestRunner>,
    classifier: Box<dyn OutcomeClassifier>,
}

impl TddGate {
    pub fn new(
        rules: PathRules,
        request: TestRequest,
        runner: Box<dyn TestRunner>,
        classifier: Box<dyn OutcomeClassifier>,
    ) -> Self {
        Self {
            phase: TddPhase::Red,
            edit_pending: false,
            awaiting_ack: false,
            rules,
            request,
            runner,
            classifier,
        }
    }

    pub fn phase(&self) -> TddPhase {
        self.phase
    }

    pub fn edit_pending(&self) -> bool {
        self.edit_pending
    }

    pub fn awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// Fresh cycle: Red, nothing pending, auto-runs enabled.
    pub fn reset(&mut self) {
        self.phase = TddPhase::Red;
        self.edit_pending = false;
        self.awaiting_ack = false;
    }

    /// Keep the phase but drop per-turn and suspension flags.
    pub fn resume_rework(&mut self) {
        self.edit_pending = false;
        self.awaiting_ack = false;
    }

    /// Judge a write to `path`. Writes without a recognizable path are
    /// classified as neither test nor src.
    pub fn check_write(&mut self, path: Option<&str>) -> ToolDecision {
        let kind = self.rules.classify(path.unwrap_or_default());
        if let Some(reason) = tdd::write_block_reason(self.phase, kind) {
            info!(phase = %self.phase, ?kind, path, "write blocked by tdd gate");
            return ToolDecision::block(reason);
        }
        self.edit_pending = true;
        ToolDecision::Allow
    }

    /// The pending write did not land.
    pub fn discard_edit(&mut self) {
        self.edit_pending = false;
    }

    pub fn should_run(&self) -> bool {
        self.edit_pending && !self.awaiting_ack
    }

    /// Run the test command, classify, and advance the phase.
    pub fn run_tests(&mut self) -> GateRun {
        self.edit_pending = false;
        let run = match self.runner.run(&self.request) {
            Ok(run) => run,
            Err(err) => {
                warn!(error = %err, "test command could not run");
                TestRun::errored(format!("{err:#}"))
            }
        };
        let outcome = self.classifier.classify(&run);
        let step = tdd::advance(self.phase, outcome);
        info!(from = %step.from, to = %step.next, ?outcome, "tdd phase step");
        self.phase = step.next;
        if step.cycle_complete {
            self.awaiting_ack = true;
        }
        GateRun { run, outcome, step }
    }

    /// Agent acknowledged a finished cycle. Returns whether one was pending.
    pub fn acknowledge_cycle(&mut self) -> bool {
        if !self.awaiting_ack {
            return false;
        }
        self.awaiting_ack = false;
        self.phase = TddPhase::Red;
        true
    }

    /// Turn boundary: an edit only counts for the turn it happened in.
    pub fn end_turn(&mut self) {
        self.edit_pending = false;
    }
}
