//! Flow configuration stored under `.flow/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::classifier::PathRules;

/// Flow configuration (TOML).
///
/// Missing fields default to the values the controller ships with, so an
/// absent file behaves like `FlowConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowConfig {
    /// Task list file, relative to the project root.
    pub tasks_file: String,

    /// Session record file, relative to the project root.
    pub session_file: String,

    /// Tool names treated as file writes.
    pub write_tools: Vec<String>,

    /// Input fields probed, in order, for a write tool's target path.
    pub path_keys: Vec<String>,

    pub test: TestConfig,

    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestConfig {
    /// Command run after permitted edits (e.g. `["npm","test"]`).
    pub command: Vec<String>,

    /// Hard wall-clock limit for one test run.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    pub outcome: OutcomeMode,

    /// Substrings in stderr that mark a run as failed (`markers` mode).
    pub failure_markers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeMode {
    Markers,
    ExitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mode: ClassifierMode,
    /// Root-relative source folders (`folders` mode).
    pub src_dirs: Vec<String>,
    /// Root-relative test folders (`folders` mode).
    pub test_dirs: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    Substring,
    Folders,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            tasks_file: "tasks.md".to_string(),
            session_file: "session.json".to_string(),
            write_tools: vec!["write".to_string(), "edit".to_string()],
            path_keys: vec!["path".to_string(), "file_path".to_string()],
            test: TestConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".to_string(), "test".to_string()],
            timeout_secs: 5,
            output_limit_bytes: 100_000,
            outcome: OutcomeMode::Markers,
            failure_markers: vec!["FAIL".to_string(), "failed".to_string()],
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::Substring,
            src_dirs: vec!["src".to_string()],
            test_dirs: vec!["test".to_string(), "tests".to_string()],
        }
    }
}

impl ClassifierConfig {
    /// Rules for a project rooted at `root`.
    pub fn rules(&self, root: &Path) -> PathRules {
        match self.mode {
            ClassifierMode::Substring => PathRules::Substring,
            ClassifierMode::Folders => PathRules::Folders {
                root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
                src_dirs: self.src_dirs.clone(),
                test_dirs: self.test_dirs.clone(),
            },
        }
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tasks_file.trim().is_empty() {
            return Err(anyhow!("tasks_file must be non-empty"));
        }
        if self.session_file.trim().is_empty() {
            return Err(anyhow!("session_file must be non-empty"));
        }
        if self.write_tools.is_empty() {
            return Err(anyhow!("write_tools must be a non-empty array"));
        }
        if self.path_keys.is_empty() {
            return Err(anyhow!("path_keys must be a non-empty array"));
        }
        if self.test.command.is_empty() || self.test.command[0].trim().is_empty() {
            return Err(anyhow!("test.command must be a non-empty array"));
        }
        if self.test.timeout_secs == 0 {
            return Err(anyhow!("test.timeout_secs must be > 0"));
        }
        if self.test.output_limit_bytes == 0 {
            return Err(anyhow!("test.output_limit_bytes must be > 0"));
        }
        if self.test.outcome == OutcomeMode::Markers && self.test.failure_markers.is_empty() {
            return Err(anyhow!(
                "test.failure_markers must be non-empty when test.outcome = \"markers\""
            ));
        }
        if self.classifier.mode == ClassifierMode::Folders
            && (self.classifier.src_dirs.is_empty() || self.classifier.test_dirs.is_empty())
        {
            return Err(anyhow!(
                "classifier.src_dirs and classifier.test_dirs must be non-empty in folders mode"
            ));
        }
        Ok(())
    }

    pub fn is_write_tool(&self, tool_name: &str) -> bool {
        self.write_tools.iter().any(|tool| tool == tool_name)
    }
}

/// Canonical file locations for a project root.
#[derive(Debug, Clone)]
pub struct FlowPaths {
    pub root: PathBuf,
    pub flow_dir: PathBuf,
    pub config_path: PathBuf,
    pub tasks_path: PathBuf,
    pub session_path: PathBuf,
}

impl FlowPaths {
    pub fn new(root: impl Into<PathBuf>, cfg: &FlowConfig) -> Self {
        let root = root.into();
        let flow_dir = root.join(".flow");
        Self {
            config_path: flow_dir.join("config.toml"),
            tasks_path: root.join(&cfg.tasks_file),
            session_path: root.join(&cfg.session_file),
            flow_dir,
            root,
        }
    }

    /// Config path for `root` without loading anything.
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".flow").join("config.toml")
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FlowConfig::default()`.
pub fn load_config(path: &Path) -> Result<FlowConfig> {
    if !path.exists() {
        let cfg = FlowConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FlowConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FlowConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
