//! Names and registration descriptors for agent tools and host commands.

use serde::Serialize;
use serde_json::{Value, json};

pub const TOOL_LIST_TASKS: &str = "list-tasks";
pub const TOOL_SELECT_TASK: &str = "select-task";
pub const TOOL_START_DEV: &str = "start-dev";
pub const TOOL_REVIEW_TASK: &str = "review-task";

pub const CMD_START_FLOW: &str = "start-flow";
pub const CMD_RESUME_FLOW: &str = "resume-flow";
pub const CMD_STOP_FLOW: &str = "stop-flow";
pub const CMD_LIST_TASKS: &str = "list-tasks";
pub const CMD_ADD_TASK: &str = "add-task";

/// An agent-callable tool as the host should register it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// JSON schema of the `params` object.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
}

fn no_params() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn string_param(name: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": { name: { "type": "string", "description": description } },
        "required": [name],
    })
}

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: TOOL_LIST_TASKS,
            label: "List Tasks",
            description: "List the open tasks of the project.",
            parameters: no_params(),
        },
        ToolSpec {
            name: TOOL_SELECT_TASK,
            label: "Select Task",
            description: "Select one open task by name and start planning it. Only available in IDLE state.",
            parameters: string_param("name", "Name of the open task to work on"),
        },
        ToolSpec {
            name: TOOL_START_DEV,
            label: "Start Development",
            description: "Submit the analyzed requirements for confirmation and proceed to development. Only available in PLAN state.",
            parameters: string_param("requirements", "The gathered task requirements"),
        },
        ToolSpec {
            name: TOOL_REVIEW_TASK,
            label: "Review Task",
            description: "Ask the user to review the implementation. Only available in DEV state.",
            parameters: no_params(),
        },
    ]
}

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: CMD_START_FLOW,
            description: "Start the task workflow",
        },
        CommandSpec {
            name: CMD_RESUME_FLOW,
            description: "Resume the workflow from the saved session",
        },
        CommandSpec {
            name: CMD_STOP_FLOW,
            description: "Stop the task workflow",
        },
        CommandSpec {
            name: CMD_LIST_TASKS,
            description: "Show all tasks",
        },
        CommandSpec {
            name: CMD_ADD_TASK,
            description: "Add a new open task",
        },
    ]
}
