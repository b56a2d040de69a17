//! NDJSON stdio bridge between a host runtime and the controller.
//!
//! The host writes one [`HostEvent`] per line. The core answers every event
//! with exactly one `reply` (or `error`) line, and may interleave `notify`,
//! `steer`, `confirm` and `input` lines before it. `confirm` and `input` block
//! until the host writes the matching `confirm_reply` / `input_reply` line.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::core::catalog::{CommandSpec, ToolSpec};
use crate::core::events::{EventReply, HostEvent};
use crate::core::types::NotifyLevel;
use crate::flow::Flow;
use crate::io::host::Host;

/// Lines written by the core.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreMessage {
    Register {
        tools: Vec<ToolSpec>,
        commands: Vec<CommandSpec>,
    },
    Notify {
        message: String,
        level: NotifyLevel,
    },
    Confirm {
        title: String,
        message: String,
    },
    Input {
        prompt: String,
    },
    Steer {
        message: String,
    },
    Reply {
        reply: EventReply,
    },
    Error {
        message: String,
    },
}

/// Answers the host sends to blocking requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAnswer {
    ConfirmReply {
        confirmed: bool,
    },
    InputReply {
        #[serde(default)]
        value: Option<String>,
    },
}

pub struct Bridge<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Bridge<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Announce tools and commands, then handle events until EOF.
    /// Returns the number of events handled.
    pub fn serve(&mut self, flow: &mut Flow) -> Result<usize> {
        self.send(&CoreMessage::Register {
            tools: flow.tools(),
            commands: flow.commands(),
        })?;

        let mut handled = 0;
        while let Some(line) = self.next_line()? {
            let event: HostEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(err) => {
                    debug!(%line, "unparseable host event");
                    self.send(&CoreMessage::Error {
                        message: format!("invalid event: {err}"),
                    })?;
                    continue;
                }
            };
            handled += 1;
            let message = match flow.handle(event, self) {
                Ok(reply) => CoreMessage::Reply { reply },
                Err(err) => {
                    error!(error = %format!("{err:#}"), "event handling failed");
                    CoreMessage::Error {
                        message: format!("{err:#}"),
                    }
                }
            };
            self.send(&message)?;
        }
        info!(handled, "host closed the event stream");
        Ok(handled)
    }

    fn send(&mut self, message: &CoreMessage) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message).context("failed to encode message")?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .context("failed to write to host")
    }

    /// Next non-blank line, or `None` at EOF.
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .context("failed to read from host")?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    fn await_answer(&mut self) -> Result<HostAnswer> {
        let line = self
            .next_line()?
            .ok_or_else(|| anyhow!("host closed the stream while a reply was pending"))?;
        serde_json::from_str(&line).with_context(|| format!("expected a reply line, got: {line}"))
    }
}

impl<R: BufRead, W: Write> Host for Bridge<R, W> {
    fn notify(&mut self, message: &str, level: NotifyLevel) -> Result<()> {
        self.send(&CoreMessage::Notify {
            message: message.to_string(),
            level,
        })
    }

    fn confirm(&mut self, title: &str, message: &str) -> Result<bool> {
        self.send(&CoreMessage::Confirm {
            title: title.to_string(),
            message: message.to_string(),
        })?;
        match self.await_answer()? {
            HostAnswer::ConfirmReply { confirmed } => Ok(confirmed),
            other => bail!("expected confirm_reply, got {other:?}"),
        }
    }

    fn input(&mut self, prompt: &str) -> Result<Option<String>> {
        self.send(&CoreMessage::Input {
            prompt: prompt.to_string(),
        })?;
        match self.await_answer()? {
            HostAnswer::InputReply { value } => Ok(value),
            other => bail!("expected input_reply, got {other:?}"),
        }
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        self.send(&CoreMessage::Steer {
            message: message.to_string(),
        })
    }
}
