//! Workflow controller: owns every piece of mutable workflow state and routes
//! host events to the active [`FlowState`].
//!
//! One `Flow` is constructed per workflow session and passed by reference to
//! each handler. Agent tools never return an error; every failure is rendered
//! as a `FAILED:` [`ToolResponse`].

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::catalog::{self, CommandSpec, ToolSpec};
use crate::core::error::FlowError;
use crate::core::events::{
    EventReply, HostEvent, ToolCall, ToolDecision, ToolResponse, ToolResult, TurnEnd,
};
use crate::core::types::{NotifyLevel, StateName, Task, TddPhase};
use crate::io::config::{FlowConfig, FlowPaths, load_config};
use crate::io::host::Host;
use crate::io::prompt::PromptEngine;
use crate::io::session_store::SessionStore;
use crate::io::task_store::TaskStore;
use crate::io::test_runner::{CommandTestRunner, TestRequest, TestRunner, classifier_for};
use crate::state::dev::DevState;
use crate::state::gate::TddGate;
use crate::state::plan::PlanVerdict;
use crate::state::review::ReviewVerdict;
use crate::state::{Entry, EntryReason, StateContext, StateTable};

const CYCLE_DONE_MARKER: &str = "[DONE]";

/// Stores and templates shared by every state.
struct FlowEnv {
    config: FlowConfig,
    paths: FlowPaths,
    tasks: TaskStore,
    session: SessionStore,
    prompts: PromptEngine,
}

impl FlowEnv {
    fn context<'a>(&'a self, host: &'a mut dyn Host) -> StateContext<'a> {
        StateContext {
            host,
            session: &self.session,
            prompts: &self.prompts,
            config: &self.config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SelectTaskParams {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct StartDevParams {
    #[serde(default)]
    requirements: String,
}

pub struct Flow {
    env: FlowEnv,
    states: StateTable,
    /// `None` while the flow is stopped.
    current: Option<StateName>,
    task: Option<Task>,
}

impl Flow {
    /// Load `.flow/config.toml` under `root` and run tests as child processes.
    pub fn open(root: &Path) -> Result<Self> {
        let config = load_config(&FlowPaths::config_path(root))?;
        Ok(Self::with_runner(root, config, Box::new(CommandTestRunner)))
    }

    pub fn with_runner(
        root: impl Into<PathBuf>,
        config: FlowConfig,
        runner: Box<dyn TestRunner>,
    ) -> Self {
        let paths = FlowPaths::new(root, &config);
        let gate = TddGate::new(
            config.classifier.rules(&paths.root),
            TestRequest::from_config(&paths.root, &config.test),
            runner,
            classifier_for(&config.test),
        );
        let env = FlowEnv {
            tasks: TaskStore::new(&paths.tasks_path),
            session: SessionStore::new(&paths.session_path),
            prompts: PromptEngine::new(),
            paths,
            config,
        };
        Self {
            env,
            states: StateTable::new(DevState::new(gate)),
            current: None,
            task: None,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.env.config
    }

    pub fn paths(&self) -> &FlowPaths {
        &self.env.paths
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.env.tasks
    }

    pub fn session(&self) -> &SessionStore {
        &self.env.session
    }

    pub fn current_state(&self) -> Option<StateName> {
        self.current
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn bound_task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn tdd_phase(&self) -> TddPhase {
        self.states.dev.phase()
    }

    /// A TDD cycle finished and is waiting for the agent's `[DONE]`.
    pub fn awaiting_cycle_ack(&self) -> bool {
        self.states.dev.gate().awaiting_ack()
    }

    pub fn plan_blocking(&self) -> bool {
        self.states.plan.is_blocking()
    }

    pub fn tools(&self) -> Vec<ToolSpec> {
        catalog::tools()
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        catalog::commands()
    }

    /// Route one host event. Errors only escape for host I/O failures outside
    /// an agent tool.
    pub fn handle(&mut self, event: HostEvent, host: &mut dyn Host) -> Result<EventReply> {
        match event {
            HostEvent::ToolCall(call) => self.on_tool_call(&call, host).map(EventReply::Decision),
            HostEvent::ToolResult(result) => {
                self.on_tool_result(&result, host)?;
                Ok(EventReply::Ack)
            }
            HostEvent::TurnEnd(turn) => {
                self.on_turn_end(&turn, host)?;
                Ok(EventReply::Ack)
            }
            HostEvent::Command { name } => {
                self.run_command(&name, host)?;
                Ok(EventReply::Ack)
            }
            HostEvent::Tool { name, params } => Ok(self.call_tool(&name, &params, host).into()),
        }
    }

    pub fn on_tool_call(&mut self, call: &ToolCall, host: &mut dyn Host) -> Result<ToolDecision> {
        let Some(current) = self.current else {
            return Ok(ToolDecision::Allow);
        };
        let mut cx = self.env.context(host);
        let decision = self.states.get_mut(current).on_tool_call(&mut cx, call)?;
        if let ToolDecision::Block { reason } = &decision {
            info!(state = %current, tool = %call.tool_name, %reason, "tool call blocked");
        }
        Ok(decision)
    }

    pub fn on_tool_result(&mut self, result: &ToolResult, host: &mut dyn Host) -> Result<()> {
        let Some(current) = self.current else {
            return Ok(());
        };
        let mut cx = self.env.context(host);
        self.states.get_mut(current).on_tool_result(&mut cx, result)
    }

    /// Acknowledge a finished TDD cycle, then nudge an agent that stopped
    /// before the workflow did.
    pub fn on_turn_end(&mut self, turn: &TurnEnd, host: &mut dyn Host) -> Result<()> {
        let Some(current) = self.current else {
            return Ok(());
        };

        if current == StateName::Dev {
            let mut cx = self.env.context(host);
            let said_done = turn
                .last_message
                .as_deref()
                .is_some_and(|message| message.contains(CYCLE_DONE_MARKER));
            if said_done {
                self.states.dev.acknowledge(&mut cx)?;
            }
            self.states.dev.end_turn();
        }

        if current == StateName::Idle && self.env.tasks.open_tasks().is_empty() {
            debug!("idle with no open tasks; agent may stop");
            return Ok(());
        }
        let nudge = self.env.prompts.nudge(current, self.tdd_phase())?;
        host.send_message(&nudge)
    }

    // Commands

    pub fn run_command(&mut self, name: &str, host: &mut dyn Host) -> Result<()> {
        match name {
            catalog::CMD_START_FLOW => self.start(host),
            catalog::CMD_RESUME_FLOW => self.resume(host),
            catalog::CMD_STOP_FLOW => self.stop(host),
            catalog::CMD_LIST_TASKS => self.show_tasks(host),
            catalog::CMD_ADD_TASK => self.add_task_interactive(host),
            other => {
                warn!(command = other, "unknown command");
                host.notify(&format!("Unknown command: {other}"), NotifyLevel::Error)
            }
        }
    }

    #[instrument(skip_all)]
    pub fn start(&mut self, host: &mut dyn Host) -> Result<()> {
        host.notify("start flow", NotifyLevel::Info)?;
        self.deactivate(host)?;
        let prompt = self.transition(StateName::Idle, EntryReason::Start, host)?;
        host.send_message(&prompt)
    }

    pub fn stop(&mut self, host: &mut dyn Host) -> Result<()> {
        host.notify("stop flow", NotifyLevel::Info)?;
        self.deactivate(host)
    }

    /// Re-enter the state recorded in the session file and replay its prompt.
    #[instrument(skip_all)]
    pub fn resume(&mut self, host: &mut dyn Host) -> Result<()> {
        host.notify("resume flow", NotifyLevel::Info)?;
        let Some(record) = self.env.session.read_session() else {
            return host.notify(
                "No active session found. Start a new session by selecting a task.",
                NotifyLevel::Error,
            );
        };
        let Some(target) = record.status.resume_state() else {
            return host.notify(
                &format!(
                    "Session for task \"{}\" has status {} and cannot be resumed.",
                    record.task_name,
                    record.status.as_str()
                ),
                NotifyLevel::Error,
            );
        };

        self.deactivate(host)?;
        self.task = Some(Task::open(
            record.task_name.clone(),
            record.task_description.clone(),
        ));
        host.notify(
            &format!(
                "Resume {} session for task: {}",
                record.status.as_str(),
                record.task_name
            ),
            NotifyLevel::Info,
        )?;

        let mut message = self.transition(target, EntryReason::Resume, host)?;
        if target == StateName::Review {
            let response = self.conclude_review(host)?;
            message = format!("{message}\n\n{}", response.render());
        }
        // The plan prompt already names the description; only Dev replays requirements.
        let description = if target == StateName::Plan {
            ""
        } else {
            record.task_description.as_str()
        };
        let requirements = if target == StateName::Dev {
            record.requirements.as_str()
        } else {
            ""
        };
        if let Some(context) = self
            .env
            .prompts
            .resume_context(description, requirements)?
        {
            message = format!("{message}\n\n{context}");
        }
        host.send_message(&message)
    }

    pub fn show_tasks(&mut self, host: &mut dyn Host) -> Result<()> {
        let tasks = self.env.tasks.get_tasks();
        if tasks.is_empty() {
            return host.notify("No open tasks found", NotifyLevel::Info);
        }
        let mut text = String::from("tasks:");
        for task in &tasks {
            let mark = if task.is_done { 'x' } else { ' ' };
            text.push_str(&format!("\n• [{mark}] {}", task.name));
        }
        host.notify(&text, NotifyLevel::Info)
    }

    pub fn add_task_interactive(&mut self, host: &mut dyn Host) -> Result<()> {
        let name = host.input("Task name")?.unwrap_or_default();
        if name.trim().is_empty() {
            return host.notify("Task name must not be empty.", NotifyLevel::Error);
        }
        let description = host
            .input("Task description (optional)")?
            .unwrap_or_default();
        match self.env.tasks.add_task(&name, &description) {
            Ok(task) => host.notify(&format!("Task \"{}\" added.", task.name), NotifyLevel::Info),
            Err(err) => host.notify(&failure_text(&err), NotifyLevel::Error),
        }
    }

    // Agent tools

    pub fn call_tool(&mut self, name: &str, params: &Value, host: &mut dyn Host) -> ToolResponse {
        let result = match name {
            catalog::TOOL_LIST_TASKS => self.list_tasks(),
            catalog::TOOL_SELECT_TASK => parse_params::<SelectTaskParams>(params)
                .and_then(|p| self.select_task(&p.name, host)),
            catalog::TOOL_START_DEV => parse_params::<StartDevParams>(params)
                .and_then(|p| self.start_dev(&p.requirements, host)),
            catalog::TOOL_REVIEW_TASK => self.review_task(host),
            other => Err(FlowError::InvalidInput(format!("unknown tool \"{other}\"")).into()),
        };
        match result {
            Ok(response) => response,
            Err(err) => {
                info!(tool = name, error = %format!("{err:#}"), "tool failed");
                ToolResponse::failed(failure_text(&err))
            }
        }
    }

    pub fn list_tasks(&self) -> Result<ToolResponse> {
        if self.current.is_none() {
            return Err(FlowError::not_running().into());
        }
        let open = self.env.tasks.open_tasks();
        if open.is_empty() {
            return Ok(ToolResponse::success(
                "no open tasks found. Ask the user to add tasks to the task list (format: `- [ ] <name> - <description>`).",
            ));
        }
        let names: Vec<&str> = open.iter().map(|task| task.name.as_str()).collect();
        Ok(ToolResponse::success(format!(
            "your current open tasks are: {}",
            names.join(",")
        )))
    }

    #[instrument(skip(self, host))]
    pub fn select_task(&mut self, name: &str, host: &mut dyn Host) -> Result<ToolResponse> {
        self.require_state("select a task", StateName::Idle)?;
        if name.trim().is_empty() {
            return Err(FlowError::InvalidInput(
                "you need to provide a name as parameter that defines the task name".to_string(),
            )
            .into());
        }
        let Some(mut task) = self.env.tasks.find_open(name) else {
            return Err(FlowError::InvalidInput(format!(
                "your selected task \"{}\" does not exist. Use list-tasks tool to see open tasks and then try again the select-task tool",
                name.trim()
            ))
            .into());
        };

        let confirmed = host.confirm("Confirm Task", &format!("selected task is \"{}\"", task.name))?;
        if !confirmed {
            return Err(FlowError::UserRejection(
                "user denied selecting this task. Wait for user input before proceeding."
                    .to_string(),
            )
            .into());
        }
        if task.description.is_empty() {
            task.description = host
                .input("Add context or description for this task (optional):")?
                .unwrap_or_default()
                .trim()
                .to_string();
        }

        let previous = self.task.replace(task);
        match self.transition(StateName::Plan, EntryReason::Advance, host) {
            Ok(prompt) => Ok(ToolResponse::success(prompt)),
            Err(err) => {
                self.task = previous;
                Err(err)
            }
        }
    }

    #[instrument(skip(self, host, requirements))]
    pub fn start_dev(&mut self, requirements: &str, host: &mut dyn Host) -> Result<ToolResponse> {
        self.require_state("start development", StateName::Plan)?;
        if self.task.is_none() {
            return Err(FlowError::GuardViolation(
                "no task selected. Use select-task tool first.".to_string(),
            )
            .into());
        }
        let requirements = requirements.trim();
        if requirements.is_empty() {
            return Err(FlowError::InvalidInput(
                "you need to provide the gathered requirements as parameter".to_string(),
            )
            .into());
        }

        let mut cx = self.env.context(host);
        match self.states.plan.complete(&mut cx, requirements)? {
            PlanVerdict::Rejected { reason } => Err(FlowError::UserRejection(reason).into()),
            PlanVerdict::Accepted => {
                let prompt = self.transition(StateName::Dev, EntryReason::Advance, host)?;
                Ok(ToolResponse::success(prompt))
            }
        }
    }

    #[instrument(skip_all)]
    pub fn review_task(&mut self, host: &mut dyn Host) -> Result<ToolResponse> {
        self.require_state("review a task", StateName::Dev)?;
        let prompt = self.transition(StateName::Review, EntryReason::Advance, host)?;
        debug!(%prompt, "entered review");
        self.conclude_review(host)
    }

    /// Ask for the human verdict while in Review and leave the state accordingly.
    ///
    /// Without a verdict the flow goes back to Dev, so the agent can submit
    /// again.
    fn conclude_review(&mut self, host: &mut dyn Host) -> Result<ToolResponse> {
        let mut cx = self.env.context(host);
        let verdict = match self.states.review.review(&mut cx) {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "no review verdict, returning to DEV");
                self.transition(StateName::Dev, EntryReason::Rework, host)?;
                return Err(err);
            }
        };
        match verdict {
            ReviewVerdict::Approved { feedback } => {
                if let Some(task) = &self.task {
                    self.env.tasks.complete_task(&task.name)?;
                }
                self.env.session.complete_session()?;
                self.task = None;
                let prompt = self.transition(StateName::Idle, EntryReason::Advance, host)?;
                Ok(ToolResponse::success(format!(
                    "{feedback} Task completed!\n\n{prompt}"
                )))
            }
            ReviewVerdict::Rejected { feedback } => {
                let prompt = self.transition(StateName::Dev, EntryReason::Rework, host)?;
                Ok(ToolResponse::failed(format!(
                    "{feedback} Review rejected. Return to DEV state to fix issues.\n\n{prompt}"
                )))
            }
        }
    }

    // Helpers

    fn require_state(&self, action: &str, expected: StateName) -> Result<(), FlowError> {
        if self.current == Some(expected) {
            Ok(())
        } else {
            Err(FlowError::wrong_state(action, expected, self.current))
        }
    }

    /// Exit the current state (if any) and enter `to`, returning its prompt.
    fn transition(
        &mut self,
        to: StateName,
        reason: EntryReason,
        host: &mut dyn Host,
    ) -> Result<String> {
        let from = self.current;
        let checked = matches!(reason, EntryReason::Advance | EntryReason::Rework);
        if let Some(from) = from.filter(|from| checked && !from.can_transition_to(to)) {
            return Err(FlowError::GuardViolation(format!(
                "cannot move from {from} state to {to} state"
            ))
            .into());
        }

        let mut cx = self.env.context(host);
        if let Some(from) = from {
            self.states.get_mut(from).on_exit(&mut cx)?;
        }
        let entry = Entry {
            task: self.task.as_ref(),
            reason,
        };
        let prompt = self.states.get_mut(to).on_enter(&mut cx, &entry)?;
        info!(from = ?from.map(StateName::label), to = to.label(), ?reason, "state transition");
        self.current = Some(to);
        Ok(prompt)
    }

    fn deactivate(&mut self, host: &mut dyn Host) -> Result<()> {
        if let Some(current) = self.current.take() {
            let mut cx = self.env.context(host);
            self.states.get_mut(current).on_exit(&mut cx)?;
            info!(state = current.label(), "flow deactivated");
        }
        self.task = None;
        Ok(())
    }
}

fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params.clone()
    };
    serde_json::from_value(params)
        .map_err(|err| FlowError::InvalidInput(format!("invalid tool parameters: {err}")).into())
}

/// Text for a `FAILED:` response: domain errors verbatim, others with context.
fn failure_text(err: &anyhow::Error) -> String {
    match err.downcast_ref::<FlowError>() {
        Some(flow_err) => flow_err.to_string(),
        None => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::types::SessionStatus;
    use crate::test_support::{ScriptedHost, TestWorkspace};

    #[test]
    fn tools_fail_while_stopped() {
        let ws = TestWorkspace::new();
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new();
        let response = flow.call_tool(catalog::TOOL_LIST_TASKS, &Value::Null, &mut host);
        assert!(response.render().starts_with("FAILED: the flow is not running"));
    }

    #[test]
    fn select_task_outside_idle_is_guarded() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([true]);
        flow.start(&mut host).expect("start");
        assert!(flow.call_tool("select-task", &json!({"name": "T1"}), &mut host).is_success());

        let again = flow.call_tool("select-task", &json!({"name": "T1"}), &mut host);
        assert_eq!(
            again.render(),
            "FAILED: you are only allowed to select a task in IDLE state, but you are currently in PLAN state"
        );
    }

    #[test]
    fn select_task_rejects_blank_and_unknown_names() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new();
        flow.start(&mut host).expect("start");

        let blank = flow.call_tool("select-task", &json!({"name": "  "}), &mut host);
        assert!(blank.render().starts_with("FAILED: you need to provide a name"));
        let unknown = flow.call_tool("select-task", &json!({"name": "T9"}), &mut host);
        assert!(unknown.render().contains("\"T9\" does not exist"));
        assert_eq!(flow.current_state(), Some(StateName::Idle));
        assert!(host.confirms_asked().is_empty());
    }

    #[test]
    fn declined_selection_keeps_idle() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([false]);
        flow.start(&mut host).expect("start");

        let response = flow.call_tool("select-task", &json!({"name": "t1"}), &mut host);
        assert!(response.render().starts_with("FAILED: user denied"));
        assert_eq!(flow.current_state(), Some(StateName::Idle));
        assert!(flow.bound_task().is_none());
        assert!(!flow.session().has_active_session());
    }

    #[test]
    fn selection_asks_for_missing_description() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new()
            .confirming([true])
            .answering([Some("parse the config".to_string())]);
        flow.start(&mut host).expect("start");
        flow.call_tool("select-task", &json!({"name": "T1"}), &mut host);

        let record = flow.session().read_session().expect("session");
        assert_eq!(record.task_description, "parse the config");
        assert_eq!(flow.bound_task().map(|t| t.description.as_str()), Some("parse the config"));
    }

    #[test]
    fn plan_blocks_writes_and_rejection_stays_in_plan() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1 - desc\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([true, false]);
        flow.start(&mut host).expect("start");
        flow.call_tool("select-task", &json!({"name": "T1"}), &mut host);

        let decision = flow
            .on_tool_call(&ToolCall::new("write", json!({"path": "notes.md"})), &mut host)
            .expect("decision");
        assert!(decision.is_blocked());

        let response = flow.call_tool("start-dev", &json!({"requirements": "R"}), &mut host);
        assert!(response.render().starts_with("FAILED: User rejected the planning."));
        assert_eq!(flow.current_state(), Some(StateName::Plan));
        assert!(flow.plan_blocking());
    }

    #[test]
    fn blank_requirements_skip_confirmation() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1 - desc\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([true]);
        flow.start(&mut host).expect("start");
        flow.call_tool("select-task", &json!({"name": "T1"}), &mut host);

        let response = flow.call_tool("start-dev", &json!({}), &mut host);
        assert!(!response.is_success());
        assert_eq!(host.confirms_asked().len(), 1);
    }

    /// Start the flow, select T1 and accept requirements "R".
    fn enter_dev(flow: &mut Flow, host: &mut ScriptedHost) {
        flow.start(host).expect("start");
        assert!(flow.call_tool("select-task", &json!({"name": "T1"}), host).is_success());
        assert!(flow.call_tool("start-dev", &json!({"requirements": "R"}), host).is_success());
        assert_eq!(flow.current_state(), Some(StateName::Dev));
    }

    #[test]
    fn start_dev_outside_plan_is_guarded() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1 - desc\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([true, true]);

        flow.start(&mut host).expect("start");
        let idle = flow.call_tool("start-dev", &json!({"requirements": "R"}), &mut host);
        assert_eq!(
            idle.render(),
            "FAILED: you are only allowed to start development in PLAN state, but you are currently in IDLE state"
        );
        assert_eq!(flow.current_state(), Some(StateName::Idle));
        assert!(!flow.session().has_active_session());

        flow.call_tool("select-task", &json!({"name": "T1"}), &mut host);
        flow.call_tool("start-dev", &json!({"requirements": "R"}), &mut host);
        let confirms = host.confirms_asked().len();
        let dev = flow.call_tool("start-dev", &json!({"requirements": "R2"}), &mut host);
        assert_eq!(
            dev.render(),
            "FAILED: you are only allowed to start development in PLAN state, but you are currently in DEV state"
        );
        assert_eq!(flow.current_state(), Some(StateName::Dev));
        assert_eq!(host.confirms_asked().len(), confirms);
        let record = flow.session().read_session().expect("session");
        assert_eq!(record.status, SessionStatus::Developing);
        assert_eq!(record.requirements, "R");
    }

    #[test]
    fn review_task_outside_dev_is_guarded() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1 - desc\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([true]);

        flow.start(&mut host).expect("start");
        let idle = flow.call_tool("review-task", &Value::Null, &mut host);
        assert_eq!(
            idle.render(),
            "FAILED: you are only allowed to review a task in DEV state, but you are currently in IDLE state"
        );
        assert_eq!(flow.current_state(), Some(StateName::Idle));

        flow.call_tool("select-task", &json!({"name": "T1"}), &mut host);
        let plan = flow.call_tool("review-task", &Value::Null, &mut host);
        assert_eq!(
            plan.render(),
            "FAILED: you are only allowed to review a task in DEV state, but you are currently in PLAN state"
        );
        assert_eq!(flow.current_state(), Some(StateName::Plan));
        assert_eq!(host.confirms_asked().len(), 1);
        let record = flow.session().read_session().expect("session");
        assert_eq!(record.status, SessionStatus::Planning);
    }

    #[test]
    fn review_without_verdict_returns_to_dev() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [ ] T1 - desc\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().confirming([true, true]);
        enter_dev(&mut flow, &mut host);

        // No answer queued for the review dialog.
        let lost = flow.call_tool("review-task", &Value::Null, &mut host);
        assert!(lost.render().starts_with("FAILED: no scripted answer"));
        assert_eq!(flow.current_state(), Some(StateName::Dev));
        assert_eq!(
            flow.session().read_session().map(|r| r.status),
            Some(SessionStatus::Developing)
        );

        host.push_confirm(true);
        let retry = flow.call_tool("review-task", &Value::Null, &mut host);
        assert!(retry.is_success(), "{}", retry.render());
        assert_eq!(flow.current_state(), Some(StateName::Idle));
        assert_eq!(ws.read_tasks(), "- [x] T1 - desc\n");
    }

    #[test]
    fn unknown_tool_is_invalid_input() {
        let ws = TestWorkspace::new();
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new();
        let response = flow.call_tool("rm-rf", &Value::Null, &mut host);
        assert_eq!(response.render(), "FAILED: unknown tool \"rm-rf\"");
    }

    #[test]
    fn turn_end_is_silent_when_stopped_or_idle_without_tasks() {
        let ws = TestWorkspace::new();
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new();
        flow.on_turn_end(&TurnEnd::default(), &mut host).expect("turn end");
        assert!(host.messages().is_empty());

        flow.start(&mut host).expect("start");
        let before = host.messages().len();
        flow.on_turn_end(&TurnEnd::default(), &mut host).expect("turn end");
        assert_eq!(host.messages().len(), before);

        ws.write_tasks("- [ ] T1\n");
        flow.on_turn_end(&TurnEnd::default(), &mut host).expect("turn end");
        let last = host.messages().last().expect("nudge");
        assert!(last.starts_with("You are not done yet. Your current state is: IDLE."));
    }

    #[test]
    fn show_tasks_lists_markers() {
        let ws = TestWorkspace::new();
        ws.write_tasks("- [x] A\n- [ ] B - later\n");
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new();
        flow.show_tasks(&mut host).expect("show");
        assert_eq!(host.notifications().last().map(String::as_str), Some("tasks:\n• [x] A\n• [ ] B"));
    }

    #[test]
    fn add_task_command_validates_name() {
        let ws = TestWorkspace::new();
        let mut flow = ws.flow();
        let mut host = ScriptedHost::new().answering([Some("  ".to_string())]);
        flow.run_command("add-task", &mut host).expect("add");
        assert!(flow.tasks().get_tasks().is_empty());
        assert_eq!(host.errors(), vec!["Task name must not be empty.".to_string()]);

        let mut host = ScriptedHost::new().answering([Some("T1".to_string()), None]);
        flow.run_command("add-task", &mut host).expect("add");
        assert_eq!(flow.tasks().open_tasks(), vec![Task::open("T1", "")]);
    }
}
