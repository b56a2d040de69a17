//! Idle: no task bound; the agent must pick one.

use anyhow::Result;

use crate::core::events::{ToolCall, ToolDecision};
use crate::core::types::{StateName, TddPhase};
use crate::state::{Entry, FlowState, StateContext};

pub struct IdleState;

impl FlowState for IdleState {
    fn name(&self) -> StateName {
        StateName::Idle
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, _entry: &Entry<'_>) -> Result<String> {
        cx.notify("Flow: IDLE state")?;
        cx.prompts.state_prompt(StateName::Idle, None, TddPhase::Red)
    }

    fn on_tool_call(&mut self, cx: &mut StateContext<'_>, call: &ToolCall) -> Result<ToolDecision> {
        if cx.is_write(call) {
            return Ok(ToolDecision::block(
                "You are not allowed to write or edit files in IDLE state.",
            ));
        }
        Ok(ToolDecision::Allow)
    }
}
