//! Test-only fakes for the host runtime and the test command.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::NotifyLevel;
use crate::flow::Flow;
use crate::io::config::{FlowConfig, FlowPaths};
use crate::io::host::Host;
use crate::io::test_runner::{TestRequest, TestRun, TestRunner};

/// Host double with queued answers that records everything it is told.
///
/// An unanswered `input` counts as dismissed; an unanswered `confirm` is an
/// error so a test cannot silently skip a dialog.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    confirms: VecDeque<bool>,
    inputs: VecDeque<Option<String>>,
    notifications: Vec<String>,
    levels: Vec<NotifyLevel>,
    messages: Vec<String>,
    confirms_asked: Vec<(String, String)>,
    inputs_asked: Vec<String>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirms.extend(answers);
        self
    }

    pub fn answering(mut self, answers: impl IntoIterator<Item = Option<String>>) -> Self {
        self.inputs.extend(answers);
        self
    }

    pub fn push_confirm(&mut self, answer: bool) {
        self.confirms.push_back(answer);
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    /// Notifications sent at [`NotifyLevel::Error`].
    pub fn errors(&self) -> Vec<String> {
        self.notifications
            .iter()
            .zip(&self.levels)
            .filter(|(_, level)| **level == NotifyLevel::Error)
            .map(|(message, _)| message.clone())
            .collect()
    }

    /// Steering messages delivered to the agent.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn confirms_asked(&self) -> &[(String, String)] {
        &self.confirms_asked
    }

    pub fn inputs_asked(&self) -> &[String] {
        &self.inputs_asked
    }
}

impl Host for ScriptedHost {
    fn notify(&mut self, message: &str, level: NotifyLevel) -> Result<()> {
        self.notifications.push(message.to_string());
        self.levels.push(level);
        Ok(())
    }

    fn confirm(&mut self, title: &str, message: &str) -> Result<bool> {
        self.confirms_asked
            .push((title.to_string(), message.to_string()));
        self.confirms
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for confirm \"{title}\""))
    }

    fn input(&mut self, prompt: &str) -> Result<Option<String>> {
        self.inputs_asked.push(prompt.to_string());
        Ok(self.inputs.pop_front().flatten())
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        self.messages.push(message.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ScriptedRuns {
    queue: VecDeque<TestRun>,
    calls: usize,
}

/// Test runner returning queued runs. Clones share one queue, so a test can
/// keep a handle after boxing a clone into a [`Flow`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedTestRunner {
    inner: Rc<RefCell<ScriptedRuns>>,
}

impl ScriptedTestRunner {
    pub fn new(runs: impl IntoIterator<Item = TestRun>) -> Self {
        let runner = Self::default();
        runner.inner.borrow_mut().queue.extend(runs);
        runner
    }

    pub fn push(&self, run: TestRun) {
        self.inner.borrow_mut().queue.push_back(run);
    }

    pub fn calls(&self) -> usize {
        self.inner.borrow().calls
    }
}

impl TestRunner for ScriptedTestRunner {
    fn run(&self, _request: &TestRequest) -> Result<TestRun> {
        let mut inner = self.inner.borrow_mut();
        inner.calls += 1;
        inner
            .queue
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted test run left"))
    }
}

/// A passing run as a test framework would print it.
pub fn passing_run() -> TestRun {
    TestRun::exited(0, "1 passing", "")
}

/// A failing run with a failure marker on stderr.
pub fn failing_run() -> TestRun {
    TestRun::exited(1, "0 passing\n1 failing", "FAIL test/t1.spec")
}

/// Temporary project root with a config and helpers for the backing files.
pub struct TestWorkspace {
    dir: TempDir,
    config: FlowConfig,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(FlowConfig::default())
    }

    pub fn with_config(config: FlowConfig) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn paths(&self) -> FlowPaths {
        FlowPaths::new(self.root(), &self.config)
    }

    pub fn write_tasks(&self, contents: &str) {
        fs::write(self.paths().tasks_path, contents).expect("write tasks");
    }

    pub fn read_tasks(&self) -> String {
        fs::read_to_string(self.paths().tasks_path).expect("read tasks")
    }

    pub fn write_session(&self, contents: &str) {
        fs::write(self.paths().session_path, contents).expect("write session");
    }

    pub fn read_session_file(&self) -> String {
        fs::read_to_string(self.paths().session_path).unwrap_or_default()
    }

    /// Flow with an empty scripted test runner.
    pub fn flow(&self) -> Flow {
        self.flow_with(ScriptedTestRunner::default())
    }

    pub fn flow_with(&self, runner: ScriptedTestRunner) -> Flow {
        Flow::with_runner(self.root(), self.config.clone(), Box::new(runner))
    }
}
