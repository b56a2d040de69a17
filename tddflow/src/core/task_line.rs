//! Line grammar of the task list file.
//!
//! ```text
//! - [ ] <name>[ - <description>]   open
//! - [x] <name>[ - <description>]   done
//! ```
//!
//! Any other line is not a task and passes through rewrites untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Task;

const OPEN_MARKER: &str = "- [ ]";
const DONE_MARKER: &str = "- [x]";
const DESCRIPTION_SEPARATOR: &str = " - ";

static TASK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- \[( |x)\] (.+?)(?: - (.*))?$").expect("task line regex should be valid")
});

/// Parse one line into a task, or `None` if the line is not a task.
pub fn parse_line(line: &str) -> Option<Task> {
    let caps = TASK_LINE_RE.captures(line.trim_end_matches(['\r', '\n']))?;
    let name = caps.get(2)?.as_str().trim();
    if name.is_empty() {
        return None;
    }
    let description = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
    Some(Task {
        name: name.to_string(),
        description: description.to_string(),
        is_done: caps.get(1).is_some_and(|m| m.as_str() == "x"),
    })
}

/// Parse every task line of `content` in file order.
pub fn parse_tasks(content: &str) -> Vec<Task> {
    content.lines().filter_map(parse_line).collect()
}

/// Render a new open-task line (no trailing newline).
pub fn format_open(name: &str, description: &str) -> String {
    let name = name.trim();
    let description = description.trim();
    if description.is_empty() {
        format!("{OPEN_MARKER} {name}")
    } else {
        format!("{OPEN_MARKER} {name}{DESCRIPTION_SEPARATOR}{description}")
    }
}

/// Rewrite an open line's marker to done, keeping the rest of the line.
pub fn mark_done(line: &str) -> String {
    match line.strip_prefix(OPEN_MARKER) {
        Some(rest) => format!("{DONE_MARKER}{rest}"),
        None => line.to_string(),
    }
}

/// Task name comparison shared by selection, completion, and duplicate checks.
///
/// Trimmed, case-insensitive.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Reasons a name/description pair cannot be stored as a task line.
pub fn validate_new_task(name: &str, description: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("task name is required".to_string());
    }
    if name.contains(['\n', '\r']) || description.contains(['\n', '\r']) {
        return Err("task name and description must be a single line".to_string());
    }
    if name.contains(DESCRIPTION_SEPARATOR) {
        return Err(format!(
            "task name must not contain the separator '{}'",
            DESCRIPTION_SEPARATOR.trim()
        ));
    }
    Ok(())
}
