//! Instructional text for the agent, rendered from minijinja templates.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::{StateName, Task, TddPhase};

const IDLE_TEMPLATE: &str = include_str!("prompts/idle.md");
const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const DEV_TEMPLATE: &str = include_str!("prompts/dev.md");
const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");
const TEST_REPORT_TEMPLATE: &str = include_str!("prompts/test_report.md");
const NUDGE_TEMPLATE: &str = include_str!("prompts/nudge.md");
const RESUME_TEMPLATE: &str = include_str!("prompts/resume.md");

/// Task fields exposed to templates.
#[derive(Debug, Clone, Serialize)]
struct TaskContext<'a> {
    name: &'a str,
    description: &'a str,
}

impl<'a> TaskContext<'a> {
    fn from_task(task: &'a Task) -> Self {
        Self {
            name: &task.name,
            description: &task.description,
        }
    }
}

/// Inputs for a post-edit test report.
#[derive(Debug, Clone)]
pub struct TestReport<'a> {
    pub phase: TddPhase,
    pub passed: bool,
    pub guidance: &'a str,
    pub output: &'a str,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        for (name, source) in [
            ("idle", IDLE_TEMPLATE),
            ("plan", PLAN_TEMPLATE),
            ("dev", DEV_TEMPLATE),
            ("review", REVIEW_TEMPLATE),
            ("test_report", TEST_REPORT_TEMPLATE),
            ("nudge", NUDGE_TEMPLATE),
            ("resume", RESUME_TEMPLATE),
        ] {
            env.add_template(name, source)
                .expect("bundled prompt templates should be valid");
        }
        Self { env }
    }

    /// Entry prompt for `state`. `phase` is only shown in Dev.
    pub fn state_prompt(
        &self,
        state: StateName,
        task: Option<&Task>,
        phase: TddPhase,
    ) -> Result<String> {
        let name = match state {
            StateName::Idle => "idle",
            StateName::Plan => "plan",
            StateName::Dev => "dev",
            StateName::Review => "review",
        };
        let template = self.env.get_template(name)?;
        let rendered = template.render(context! {
            task => task.map(TaskContext::from_task),
            phase => phase.label(),
        })?;
        Ok(rendered.trim().to_string())
    }

    pub fn test_report(&self, report: &TestReport<'_>) -> Result<String> {
        let template = self.env.get_template("test_report")?;
        let rendered = template.render(context! {
            phase => report.phase.label(),
            passed => report.passed,
            guidance => report.guidance,
            output => report.output.trim(),
        })?;
        Ok(rendered.trim().to_string())
    }

    /// End-of-turn reminder for a workflow that is not finished.
    pub fn nudge(&self, state: StateName, phase: TddPhase) -> Result<String> {
        let template = self.env.get_template("nudge")?;
        let rendered = template.render(context! {
            state => state.label(),
            phase => phase.label(),
        })?;
        Ok(rendered.trim().to_string())
    }

    /// Extra context replayed after a resumed entry prompt, if any.
    pub fn resume_context(&self, description: &str, requirements: &str) -> Result<Option<String>> {
        let template = self.env.get_template("resume")?;
        let rendered = template.render(context! {
            description => description.trim(),
            requirements => requirements.trim(),
        })?;
        let rendered = rendered.trim();
        Ok((!rendered.is_empty()).then(|| rendered.to_string()))
    }
}
