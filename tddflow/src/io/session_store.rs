//! Session record storage (`session.json`) for resuming an in-progress task.
//!
//! At most one session exists. Every mutation rewrites the whole file before
//! returning, so the record always matches the controller's last transition.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::FlowError;
use crate::core::types::SessionStatus;

/// Persisted session record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub task_name: String,
    #[serde(default, alias = "description")]
    pub task_description: String,
    #[serde(default)]
    pub requirements: String,
    pub status: SessionStatus,
    /// ISO-8601 UTC timestamp of session start.
    pub started_at: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace any existing record with a fresh `planning` session.
    pub fn start_session(&self, task_name: &str, task_description: &str) -> Result<SessionRecord> {
        let record = SessionRecord {
            task_name: task_name.to_string(),
            task_description: task_description.to_string(),
            requirements: String::new(),
            status: SessionStatus::Planning,
            started_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        self.write(&record)?;
        Ok(record)
    }

    /// Store confirmed requirements and move the session to `developing`.
    pub fn save_requirements(&self, requirements: &str) -> Result<SessionRecord> {
        let mut record = self.require()?;
        record.requirements = requirements.to_string();
        record.status = SessionStatus::Developing;
        self.write(&record)?;
        Ok(record)
    }

    /// Set the session status. `completed` clears the record.
    pub fn update_status(&self, status: SessionStatus) -> Result<SessionRecord> {
        let mut record = self.require()?;
        record.status = status;
        if status == SessionStatus::Completed {
            self.complete_session()?;
        } else {
            self.write(&record)?;
        }
        Ok(record)
    }

    /// Empty the session file. Idempotent; a missing file is left missing.
    pub fn complete_session(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        debug!(path = %self.path.display(), "clearing session");
        fs::write(&self.path, "")
            .with_context(|| format!("clear session {}", self.path.display()))
            .map_err(|err| FlowError::StoreUnavailable(err).into())
    }

    /// The current record, or `None` for a missing, empty, or unparseable file.
    pub fn read_session(&self) -> Option<SessionRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %self.path.display(), err = %err, "no session file");
                return None;
            }
        };
        if contents.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(path = %self.path.display(), err = %err, "unparseable session, ignoring");
                None
            }
        }
    }

    pub fn has_active_session(&self) -> bool {
        self.read_session()
            .is_some_and(|record| record.status != SessionStatus::Completed)
    }

    fn require(&self) -> Result<SessionRecord> {
        self.read_session()
            .ok_or_else(|| FlowError::NoActiveSession.into())
    }

    fn write(&self, record: &SessionRecord) -> Result<()> {
        debug!(path = %self.path.display(), task = %record.task_name, status = record.status.as_str(), "writing session");
        let mut buf = serde_json::to_string_pretty(record).context("serialize session")?;
        buf.push('\n');
        write_atomic(&self.path, &buf).map_err(|err| FlowError::StoreUnavailable(err).into())
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp session {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace session {}", path.display()))?;
    Ok(())
}
