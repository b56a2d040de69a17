//! Child-process execution with a hard timeout and bounded output.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// How long the pipes may stay open once the child is gone. Processes the
/// child spawned can hold them past its exit.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn truncation_notice(&self) -> Option<String> {
        if self.stdout_truncated == 0 && self.stderr_truncated == 0 {
            return None;
        }
        Some(format!(
            "[output truncated: stdout {} bytes, stderr {} bytes]",
            self.stdout_truncated, self.stderr_truncated
        ))
    }
}

/// Bytes kept from one output stream and how many were dropped past the limit.
#[derive(Debug, Default, PartialEq, Eq)]
struct Captured {
    bytes: Vec<u8>,
    dropped: usize,
}

/// A pipe drained on a detached reader thread.
struct Capture {
    name: &'static str,
    shared: Arc<Mutex<Captured>>,
    done: Receiver<io::Result<()>>,
}

impl Capture {
    /// Wait for EOF until `deadline`, then take whatever was read so far.
    fn collect(self, deadline: Instant) -> Result<Captured> {
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.done.recv_timeout(wait) {
            Ok(read) => read.with_context(|| format!("read {}", self.name))?,
            Err(RecvTimeoutError::Timeout) => {
                warn!(stream = self.name, "pipe still open after the test command ended");
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("{} reader thread panicked", self.name));
            }
        }
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("{} buffer poisoned", self.name))?;
        Ok(std::mem::take(&mut *shared))
    }
}

/// Run `cmd` with stdin closed, killing it once `timeout` elapses.
///
/// Both pipes are drained on reader threads while the child runs, so a chatty
/// test command cannot deadlock on a full pipe. At most `output_limit_bytes`
/// of each stream is kept. Readers still blocked after the child is gone are
/// left behind, so the call returns within `timeout` plus a short grace.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let started = Instant::now();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {:?}", cmd.get_program()))?;
    debug!(pid = child.id(), "test command spawned");

    let stdout = capture(child.stdout.take(), output_limit_bytes, "stdout")?;
    let stderr = capture(child.stderr.take(), output_limit_bytes, "stderr")?;

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for test command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "test command timed out, killing it");
            child.kill().context("kill timed-out test command")?;
            (child.wait().context("reap killed test command")?, true)
        }
    };

    let grace = Instant::now() + DRAIN_GRACE;
    let drain_until = if timed_out {
        grace
    } else {
        grace.max(started + timeout)
    };
    let stdout = stdout.collect(drain_until)?;
    let stderr = stderr.collect(drain_until)?;
    if stdout.dropped + stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "test output over limit"
        );
    }

    Ok(CommandOutput {
        status,
        stdout_truncated: stdout.dropped,
        stderr_truncated: stderr.dropped,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        timed_out,
    })
}

fn capture<R>(pipe: Option<R>, limit: usize, name: &'static str) -> Result<Capture>
where
    R: Read + Send + 'static,
{
    let pipe = pipe.ok_or_else(|| anyhow!("{name} was not piped"))?;
    let shared = Arc::new(Mutex::new(Captured::default()));
    let (tx, done) = mpsc::channel();
    let sink = Arc::clone(&shared);
    thread::spawn(move || {
        // The receiver is gone once the caller stopped waiting.
        let _ = tx.send(read_limited(pipe, limit, &sink));
    });
    Ok(Capture { name, shared, done })
}

/// Drain `reader` to EOF into `sink`, keeping the first `limit` bytes.
fn read_limited<R: Read>(mut reader: R, limit: usize, sink: &Mutex<Captured>) -> io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            return Ok(());
        }
        let mut captured = sink
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?;
        let room = limit.saturating_sub(captured.bytes.len()).min(read);
        captured.bytes.extend_from_slice(&chunk[..room]);
        captured.dropped += read - room;
    }
}
