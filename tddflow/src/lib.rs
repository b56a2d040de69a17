//! Test-first workflow controller for autonomous coding agents.
//!
//! The controller runs inside a host runtime that dispatches agent events. It
//! walks the agent through a fixed lifecycle (select a task, plan, implement,
//! review) and, while implementing, gates file writes by TDD phase and runs
//! the project's tests after every permitted edit.
//!
//! - **[`core`]**: Pure, deterministic logic (types, task-line grammar, gate
//!   rule, phase table, event shapes). No I/O.
//! - **[`io`]**: Side effects (config, stores, child processes, prompts, the
//!   host trait and its stdio bridge).
//! - **[`state`]**: The Idle/Plan/Dev/Review state objects.
//! - **[`flow`]**: The controller that owns them and routes host events.

pub mod core;
pub mod exit_codes;
pub mod flow;
pub mod io;
pub mod logging;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
