//! Review: human approval of the finished task.

use anyhow::Result;

use crate::core::types::{SessionStatus, StateName, TddPhase};
use crate::state::{Entry, FlowState, StateContext, require_task};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    Approved { feedback: String },
    Rejected { feedback: String },
}

pub struct ReviewState;

impl ReviewState {
    pub fn review(&mut self, cx: &mut StateContext<'_>) -> Result<ReviewVerdict> {
        let approved = cx
            .host
            .confirm("Review Task", "Did the agent implement the task successfully?")?;
        if approved {
            Ok(ReviewVerdict::Approved {
                feedback: "User reviewed the code implementation and approved it. Full review pipeline passed."
                    .to_string(),
            })
        } else {
            Ok(ReviewVerdict::Rejected {
                feedback: "User reviewed the code implementation and denied it. Fix the issues and submit again."
                    .to_string(),
            })
        }
    }
}

impl FlowState for ReviewState {
    fn name(&self) -> StateName {
        StateName::Review
    }

    fn on_enter(&mut self, cx: &mut StateContext<'_>, entry: &Entry<'_>) -> Result<String> {
        let task = require_task(entry, StateName::Review)?;
        cx.session.update_status(SessionStatus::Reviewing)?;
        cx.notify(&format!("Flow: REVIEW state - {}", task.name))?;
        cx.prompts
            .state_prompt(StateName::Review, Some(task), TddPhase::Red)
    }
}
