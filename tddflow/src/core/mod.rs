//! Deterministic, pure logic shared by the workflow controller.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod catalog;
pub mod classifier;
pub mod error;
pub mod events;
pub mod task_line;
pub mod tdd;
pub mod types;
