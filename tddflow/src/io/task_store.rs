//! Task list persistence (`tasks.md`).
//!
//! Line order is the only ordering signal. Rewrites replace the whole file and
//! leave non-task lines untouched.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::error::FlowError;
use crate::core::task_line::{
    format_open, mark_done, names_match, parse_line, parse_tasks, validate_new_task,
};
use crate::core::types::Task;

/// Flat-file task list.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All tasks in file order. A missing or unreadable file yields no tasks.
    pub fn get_tasks(&self) -> Vec<Task> {
        match self.read() {
            Some(content) => parse_tasks(&content),
            None => Vec::new(),
        }
    }

    pub fn open_tasks(&self) -> Vec<Task> {
        self.get_tasks()
            .into_iter()
            .filter(|task| !task.is_done)
            .collect()
    }

    /// First open task whose name matches `name`.
    pub fn find_open(&self, name: &str) -> Option<Task> {
        self.open_tasks()
            .into_iter()
            .find(|task| names_match(&task.name, name))
    }

    /// Append a new open task, creating the file if absent.
    ///
    /// Fails with [`FlowError::InvalidInput`] for unstorable or duplicate names.
    pub fn add_task(&self, name: &str, description: &str) -> Result<Task> {
        validate_new_task(name, description).map_err(FlowError::InvalidInput)?;
        if let Some(existing) = self.find_open(name) {
            return Err(FlowError::InvalidInput(format!(
                "an open task named \"{}\" already exists",
                existing.name
            ))
            .into());
        }

        let mut contents = self.read().unwrap_or_default();
        let newline = if contents.contains("\r\n") { "\r\n" } else { "\n" };
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push_str(newline);
        }
        contents.push_str(&format_open(name, description));
        contents.push_str(newline);
        self.write(&contents)?;
        info!(task = name.trim(), path = %self.path.display(), "task added");
        Ok(Task::open(name.trim(), description.trim()))
    }

    /// Mark the first open task matching `name` as done.
    ///
    /// Returns `false` without touching the file when the file or the task is
    /// missing, which also makes repeated calls no-ops.
    pub fn complete_task(&self, name: &str) -> Result<bool> {
        let Some(content) = self.read() else {
            return Ok(false);
        };

        let mut completed = false;
        let lines: Vec<String> = content
            .split('\n')
            .map(|line| {
                if completed {
                    return line.to_string();
                }
                match parse_line(line) {
                    Some(task) if !task.is_done && names_match(&task.name, name) => {
                        completed = true;
                        mark_done(line)
                    }
                    _ => line.to_string(),
                }
            })
            .collect();

        if !completed {
            debug!(task = name, "no open task to complete");
            return Ok(false);
        }
        self.write(&lines.join("\n"))?;
        info!(task = name, path = %self.path.display(), "task completed");
        Ok(true)
    }

    fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Some(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "task file missing");
                None
            }
            Err(err) => {
                warn!(path = %self.path.display(), err = %err, "task file unreadable, treating as empty");
                None
            }
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("write task file {}", self.path.display()))
            .map_err(|err| FlowError::StoreUnavailable(err).into())
    }
}
