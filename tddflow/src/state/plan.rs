//! Plan: requirements analysis with all file writes blocked.

use anyhow::Result;
use tracing::info;

use crate::core::events::{ToolCall, ToolDecision};
use crate::core::types::{SessionStatus, StateName, TddPhase};
use crate::state::{Entry, EntryReason, FlowState, StateContext, require_task};

/// Human verdict on submitted requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanVerdict {
    Accepted,
    Rejected { reason: String },
}

#[derive(Debug, Default)]
pub struct PlanState {
    blocking: bool,
}

impl PlanState {
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Ask the human to confirm `requirements`; on acceptance persist them.
    pub fn complete(&mut self, cx: &mut StateContext<'_>, requirements: &str) -> Result<PlanVerdict> {
        let confirmed = cx.host.confirm(
            "Planning Complete",
            &format!("Has the task been properly analyzed?\n\nRequirements:\n{requirements}"),
        )?;
        if !confirmed {
            info!("planning rejected by user");
            return Ok(PlanVerdict::Rejected {
                reason: "User rejected the planning. Continue analyzing the task requirements."
                    .to_string(),
            });
        }
        cx.session.save_requirements(requirements)?;
        Ok(PlanVerdict::Accepted)
    }
}

impl FlowState for PlanState {
    fn name(&self) -> StateName {
        StateName::Plan
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, entry: &Entry<'_>) -> Result<String> {
        let task = require_task(entry, StateName::Plan)?;
        match entry.reason {
            EntryReason::Resume => {
                cx.session.update_status(SessionStatus::Planning)?;
            }
            _ => {
                cx.session.start_session(&task.name, &task.description)?;
            }
        }
        self.blocking = true;
        cx.notify(&format!("Flow: PLAN state - {}", task.name))?;
        cx.prompts
            .state_prompt(StateName::Plan, Some(task), TddPhase::Red)
    }

    fn on_exit(&mut self, cx: &mut StateContext<'_>) -> Result<()> {
        self.blocking = false;
        cx.notify("Flow: Leaving PLAN")
    }

    fn on_tool_call(&mut self, cx: &mut StateContext<'_>, call: &ToolCall) -> Result<ToolDecision> {
        if self.blocking && cx.is_write(call) {
            return Ok(ToolDecision::block(format!(
                "Tool \"{}\" is blocked in PLAN state. Complete planning first by using the start-dev tool to proceed to development.",
                call.tool_name
            )));
        }
        Ok(ToolDecision::Allow)
    }
}
