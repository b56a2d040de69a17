//! `tddflow`: test-first workflow controller for coding agents.
//!
//! `serve` speaks the NDJSON host protocol on stdin/stdout. The remaining
//! commands inspect and edit the task list and session record directly.

use std::io::{stdin, stdout};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tddflow::core::task_line;
use tddflow::exit_codes;
use tddflow::flow::Flow;
use tddflow::io::bridge::Bridge;
use tddflow::io::config::{FlowConfig, FlowPaths, load_config, write_config};
use tddflow::io::session_store::SessionStore;
use tddflow::io::task_store::TaskStore;
use tddflow::logging;

#[derive(Parser)]
#[command(
    name = "tddflow",
    version,
    about = "Test-first workflow controller for coding agents"
)]
struct Cli {
    /// Project root holding the task list, session record and `.flow/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write `.flow/config.toml` with default settings.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Inspect or extend the task list.
    Tasks {
        #[command(subcommand)]
        command: TasksCommand,
    },
    /// Inspect or clear the session record.
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Run the controller against a host over stdin/stdout.
    Serve,
}

#[derive(Subcommand)]
enum TasksCommand {
    /// Print every task line.
    List,
    /// Append an open task.
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Print the active session as JSON.
    Show,
    /// Remove the active session.
    Clear,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.root, force),
        Command::Tasks { command } => {
            let (_, paths) = load(&cli.root)?;
            let store = TaskStore::new(&paths.tasks_path);
            match command {
                TasksCommand::List => cmd_tasks_list(&store),
                TasksCommand::Add { name, description } => {
                    cmd_tasks_add(&store, &name, &description)
                }
            }
        }
        Command::Session { command } => {
            let (_, paths) = load(&cli.root)?;
            let store = SessionStore::new(&paths.session_path);
            match command {
                SessionCommand::Show => cmd_session_show(&store),
                SessionCommand::Clear => cmd_session_clear(&store),
            }
        }
        Command::Serve => cmd_serve(&cli.root),
    }
}

fn load(root: &Path) -> Result<(FlowConfig, FlowPaths)> {
    let config = load_config(&FlowPaths::config_path(root))?;
    let paths = FlowPaths::new(root, &config);
    Ok((config, paths))
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let path = FlowPaths::config_path(root);
    if path.exists() && !force {
        println!("{} already exists", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(&path, &FlowConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_tasks_list(store: &TaskStore) -> Result<i32> {
    let tasks = store.get_tasks();
    if tasks.is_empty() {
        println!("No tasks found in {}", store.path().display());
        return Ok(exit_codes::OK);
    }
    for task in tasks {
        let line = task_line::format_open(&task.name, &task.description);
        if task.is_done {
            println!("{}", task_line::mark_done(&line));
        } else {
            println!("{line}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_tasks_add(store: &TaskStore, name: &str, description: &str) -> Result<i32> {
    let task = store.add_task(name, description)?;
    println!("added task \"{}\"", task.name);
    Ok(exit_codes::OK)
}

fn cmd_session_show(store: &SessionStore) -> Result<i32> {
    let Some(record) = store.read_session() else {
        eprintln!("no active session");
        return Ok(exit_codes::NO_SESSION);
    };
    let json = serde_json::to_string_pretty(&record).context("serialize session")?;
    println!("{json}");
    Ok(exit_codes::OK)
}

fn cmd_session_clear(store: &SessionStore) -> Result<i32> {
    store.complete_session()?;
    println!("session cleared");
    Ok(exit_codes::OK)
}

fn cmd_serve(root: &Path) -> Result<i32> {
    let mut flow = Flow::open(root)?;
    let mut bridge = Bridge::new(stdin().lock(), stdout().lock());
    let handled = bridge.serve(&mut flow)?;
    debug!(handled, "serve finished");
    Ok(exit_codes::OK)
}
