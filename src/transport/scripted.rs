//! In-memory transport with scripted responses
//!
//! Each written command releases the next burst of lines scripted for it. An
//! empty string in a burst stands for one poll in which nothing arrives, which
//! is how line-buffered output shows up in practice.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::Transport;
use crate::error::{Result, SleuthError};
use crate::mi::EXIT_COMMAND;

/// Marker for "nothing arrived during this poll"
pub const GAP: &str = "";

#[derive(Default)]
pub struct ScriptedTransport {
    pending: VecDeque<String>,
    responses: HashMap<String, VecDeque<Vec<String>>>,
    written: Arc<Mutex<Vec<String>>>,
    close_when_drained: bool,
    fail_writes: bool,
    shut_down: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines available before any command is written (the startup burst)
    pub fn initially<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Script the response to `command`. Scripting the same command again
    /// queues another response; the last one repeats once the queue is down to it.
    pub fn on<I, S>(mut self, command: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responses
            .entry(command.to_string())
            .or_default()
            .push_back(lines.into_iter().map(Into::into).collect());
        self
    }

    /// Report a closed channel once all scripted output has been read
    pub fn close_when_drained(mut self) -> Self {
        self.close_when_drained = true;
        self
    }

    /// Make every write fail, as a dead process would
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Shared view of every line written so far
    pub fn written(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.written)
    }

    fn response_for(&mut self, command: &str) -> Vec<String> {
        match self.responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => vec![
                format!(r#"^error,msg="Undefined command: \"{}\".""#, command),
                "(gdb) ".to_string(),
            ],
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        if self.fail_writes || self.shut_down {
            return Err(SleuthError::Transport(format!("Failed to write '{}': broken pipe", line)));
        }
        if let Ok(mut written) = self.written.lock() {
            written.push(line.to_string());
        }
        if line == EXIT_COMMAND {
            self.pending.push_back("^exit".to_string());
            return Ok(());
        }
        let burst = self.response_for(line);
        self.pending.extend(burst);
        Ok(())
    }

    async fn read_line(&mut self, wait: Duration) -> Result<Option<String>> {
        match self.pending.pop_front() {
            Some(line) if line == GAP => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            Some(line) => Ok(Some(line)),
            None if self.close_when_drained || self.shut_down => {
                Err(SleuthError::Transport("debugger output closed".to_string()))
            }
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        if !self.shut_down && !self.fail_writes {
            self.write_line(EXIT_COMMAND).await?;
        }
        self.shut_down = true;
        Ok(())
    }
}
