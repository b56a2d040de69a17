//! Dev: implementation under the TDD gate.

use anyhow::Result;
use tracing::debug;

use crate::core::events::{ToolCall, ToolDecision, ToolResult};
use crate::core::types::{NotifyLevel, SessionStatus, StateName, TddPhase};
use crate::io::prompt::TestReport;
use crate::state::gate::TddGate;
use crate::state::{Entry, EntryReason, FlowState, StateContext, require_task};

pub struct DevState {
    gate: TddGate,
}

impl DevState {
    pub fn new(gate: TddGate) -> Self {
        Self { gate }
    }

    pub fn phase(&self) -> TddPhase {
        self.gate.phase()
    }

    pub fn gate(&self) -> &TddGate {
        &self.gate
    }

    /// Handle a `[DONE]` acknowledgment at the end of a turn.
    pub fn acknowledge(&mut self, cx: &mut StateContext<'_>) -> Result<bool> {
        if !self.gate.acknowledge_cycle() {
            return Ok(false);
        }
        cx.notify("TDD cycle complete. Starting a new RED phase.")?;
        Ok(true)
    }

    pub fn end_turn(&mut self) {
        self.gate.end_turn();
    }
}

impl FlowState for DevState {
    fn name(&self) -> StateName {
        StateName::Dev
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, entry: &Entry<'_>) -> Result<String> {
        let task = require_task(entry, StateName::Dev)?;
        if entry.reason == EntryReason::Rework {
            self.gate.resume_rework();
        } else {
            self.gate.reset();
        }
        cx.session.update_status(SessionStatus::Developing)?;
        cx.notify(&format!("Flow: DEV state (TDD: {})", self.gate.phase()))?;
        cx.prompts
            .state_prompt(StateName::Dev, Some(task), self.gate.phase())
    }

    fn on_tool_call(&mut self, cx: &mut StateContext<'_>, call: &ToolCall) -> Result<ToolDecision> {
        if !cx.is_write(call) {
            return Ok(ToolDecision::Allow);
        }
        let path = call.target_path(&cx.config.path_keys);
        Ok(self.gate.check_write(path))
    }

    fn on_tool_result(&mut self, cx: &mut StateContext<'_>, result: &ToolResult) -> Result<()> {
        if result.is_error && cx.config.is_write_tool(&result.tool_name) {
            debug!(tool = %result.tool_name, "write failed; nothing to test");
            self.gate.discard_edit();
            return Ok(());
        }
        if !self.gate.should_run() {
            return Ok(());
        }
        cx.notify(&format!("Running tests ({} phase)...", self.gate.phase()))?;
        let result = self.gate.run_tests();
        let passed = result.outcome.passed();
        let output = result.run.report_output();
        let report = cx.prompts.test_report(&TestReport {
            phase: result.step.from,
            passed,
            guidance: result.step.guidance,
            output: &output,
        })?;
        let level = if passed {
            NotifyLevel::Info
        } else {
            NotifyLevel::Warning
        };
        cx.host.notify(
            &format!(
                "Tests {} - TDD phase: {}",
                if passed { "passed" } else { "failed" },
                result.step.next
            ),
            level,
        )?;
        cx.host.send_message(&report)
    }
}
