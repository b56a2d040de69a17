//! Test command adapter and outcome classification.
//!
//! [`TestRunner`] decouples the TDD gate from the process that runs the suite,
//! and [`OutcomeClassifier`] decides pass/fail from what the run produced.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::error::FlowError;
use crate::core::types::TestOutcome;
use crate::io::config::{OutcomeMode, TestConfig};
use crate::io::process::run_command_with_timeout;

/// Parameters for one test run.
#[derive(Debug, Clone)]
pub struct TestRequest {
    pub workdir: PathBuf,
    pub command: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl TestRequest {
    pub fn from_config(workdir: impl Into<PathBuf>, cfg: &TestConfig) -> Self {
        Self {
            workdir: workdir.into(),
            command: cfg.command.clone(),
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

/// What a test run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when killed or never started.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Set when the command could not be run at all.
    pub error: Option<String>,
    pub truncation: Option<String>,
}

impl TestRun {
    /// A run that exited with `exit_code`.
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            timed_out: false,
            error: None,
            truncation: None,
        }
    }

    /// A run that never produced a result.
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: false,
            error: Some(message.into()),
            truncation: None,
        }
    }

    /// Whether the process ran to completion and exited zero.
    pub fn exited_cleanly(&self) -> bool {
        self.error.is_none() && !self.timed_out && self.exit_code == Some(0)
    }

    /// Output shown to the agent: stdout, then stderr, then any notices.
    pub fn report_output(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for part in [self.stdout.trim_end(), self.stderr.trim_end()] {
            if !part.is_empty() {
                parts.push(part);
            }
        }
        let mut out = parts.join("\n");
        let mut notices = Vec::new();
        if self.timed_out {
            notices.push("[test command timed out]".to_string());
        }
        if let Some(err) = &self.error {
            notices.push(format!("[test command error: {err}]"));
        }
        if let Some(truncation) = &self.truncation {
            notices.push(truncation.clone());
        }
        for notice in notices {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&notice);
        }
        out
    }
}

pub trait TestRunner {
    fn run(&self, request: &TestRequest) -> Result<TestRun>;
}

/// Runs the configured command as a child process.
pub struct CommandTestRunner;

impl TestRunner for CommandTestRunner {
    #[instrument(skip_all, fields(command = ?request.command, timeout_secs = request.timeout.as_secs()))]
    fn run(&self, request: &TestRequest) -> Result<TestRun> {
        let (program, args) = request
            .command
            .split_first()
            .ok_or_else(|| FlowError::ExternalCommandFailure("command is empty".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&request.workdir);

        let output = run_command_with_timeout(cmd, request.timeout, request.output_limit_bytes)
            .map_err(|err| FlowError::ExternalCommandFailure(format!("{err:#}")))?;
        info!(exit_code = ?output.status.code(), timed_out = output.timed_out, "test command finished");
        Ok(TestRun {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: if output.timed_out {
                None
            } else {
                output.status.code()
            },
            timed_out: output.timed_out,
            error: None,
            truncation: output.truncation_notice(),
        })
    }
}

/// Decides whether a run passed.
pub trait OutcomeClassifier {
    fn classify(&self, run: &TestRun) -> TestOutcome;
}

/// Fails on an unclean exit or any failure marker in stderr.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    markers: Vec<String>,
}

impl MarkerClassifier {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl OutcomeClassifier for MarkerClassifier {
    fn classify(&self, run: &TestRun) -> TestOutcome {
        let marked = self
            .markers
            .iter()
            .any(|marker| run.stderr.contains(marker.as_str()));
        if run.exited_cleanly() && !marked {
            TestOutcome::Pass
        } else {
            TestOutcome::Fail
        }
    }
}

/// Pass iff the command exited zero within the timeout.
#[derive(Debug, Clone, Copy)]
pub struct ExitStatusClassifier;

impl OutcomeClassifier for ExitStatusClassifier {
    fn classify(&self, run: &TestRun) -> TestOutcome {
        if run.exited_cleanly() {
            TestOutcome::Pass
        } else {
            TestOutcome::Fail
        }
    }
}

pub fn classifier_for(cfg: &TestConfig) -> Box<dyn OutcomeClassifier> {
    match cfg.outcome {
        OutcomeMode::Markers => Box::new(MarkerClassifier::new(cfg.failure_markers.clone())),
        OutcomeMode::ExitStatus => Box::new(ExitStatusClassifier),
    }
}
