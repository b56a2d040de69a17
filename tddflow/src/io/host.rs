//! UI and messaging primitives the host runtime provides to the controller.
//!
//! Calls that wait on a human (`confirm`, `input`) block the current event
//! handler until they resolve; the host delivers no other event meanwhile.

use anyhow::Result;

use crate::core::types::NotifyLevel;

pub trait Host {
    /// Show a transient notification to the user.
    fn notify(&mut self, message: &str, level: NotifyLevel) -> Result<()>;

    /// Ask the user a yes/no question.
    fn confirm(&mut self, title: &str, message: &str) -> Result<bool>;

    /// Ask the user for free text. `None` when dismissed.
    fn input(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Deliver a steering message to the agent.
    fn send_message(&mut self, message: &str) -> Result<()>;
}
