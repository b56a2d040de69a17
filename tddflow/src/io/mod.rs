//! I/O adapters for the workflow controller.

pub mod bridge;
pub mod config;
pub mod host;
pub mod process;
pub mod prompt;
pub mod session_store;
pub mod task_store;
pub mod test_runner;
