//! Workflow states behind one capability set.
//!
//! Each [`FlowState`] owns its own entry/exit actions and tool-call
//! interception; [`StateTable`] maps a [`StateName`] to its state object.

pub mod dev;
pub mod gate;
pub mod idle;
pub mod plan;
pub mod review;

use anyhow::Result;

use crate::core::events::{ToolCall, ToolDecision, ToolResult};
use crate::core::types::{NotifyLevel, StateName, Task};
use crate::io::config::FlowConfig;
use crate::io::host::Host;
use crate::io::prompt::PromptEngine;
use crate::io::session_store::SessionStore;

use self::dev::DevState;
use self::idle::IdleState;
use self::plan::PlanState;
use self::review::ReviewState;

/// Collaborators a state may use while handling one event.
pub struct StateContext<'a> {
    pub host: &'a mut dyn Host,
    pub session: &'a SessionStore,
    pub prompts: &'a PromptEngine,
    pub config: &'a FlowConfig,
}

impl StateContext<'_> {
    pub fn notify(&mut self, message: &str) -> Result<()> {
        self.host.notify(message, NotifyLevel::Info)
    }

    pub fn is_write(&self, call: &ToolCall) -> bool {
        self.config.is_write_tool(&call.tool_name)
    }
}

/// Why a state is being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryReason {
    /// `start-flow`, or a finished review returning to Idle.
    Start,
    /// Forward progress through the lifecycle.
    Advance,
    /// Reconstructed from the persisted session.
    Resume,
    /// Back to Dev after a rejected review.
    Rework,
}

#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    /// The bound task; `None` only in Idle.
    pub task: Option<&'a Task>,
    pub reason: EntryReason,
}

pub trait FlowState {
    fn name(&self) -> StateName;

    /// Persist/advance the session, notify the host, and return the prompt.
    fn on_enter(&mut self, cx: &mut StateContext<'_>, entry: &Entry<'_>) -> Result<String>;

    fn on_exit(&mut self, cx: &mut StateContext<'_>) -> Result<()> {
        cx.notify(&format!("Flow: Leaving {}", self.name()))
    }

    fn on_tool_call(&mut self, _cx: &mut StateContext<'_>, _call: &ToolCall) -> Result<ToolDecision> {
        Ok(ToolDecision::Allow)
    }

    fn on_tool_result(&mut self, _cx: &mut StateContext<'_>, _result: &ToolResult) -> Result<()> {
        Ok(())
    }
}

/// One state object per [`StateName`].
pub struct StateTable {
    pub idle: IdleState,
    pub plan: PlanState,
    pub dev: DevState,
    pub review: ReviewState,
}

impl StateTable {
    pub fn new(dev: DevState) -> Self {
        Self {
            idle: IdleState,
            plan: PlanState::default(),
            dev,
            review: ReviewState,
        }
    }

    pub fn get_mut(&mut self, name: StateName) -> &mut dyn FlowState {
        match name {
            StateName::Idle => &mut self.idle,
            StateName::Plan => &mut self.plan,
            StateName::Dev => &mut self.dev,
            StateName::Review => &mut self.review,
        }
    }
}

/// Bound task for states that require one.
pub(crate) fn require_task<'a>(entry: &Entry<'a>, state: StateName) -> Result<&'a Task> {
    entry
        .task
        .ok_or_else(|| anyhow::anyhow!("{state} state entered without a bound task"))
}
