//! Command runner - one command in flight, resolved when the session settles

use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use super::SessionLog;
use crate::config::CorrelatorConfig;
use crate::correlator;
use crate::error::{Result, SleuthError};
use crate::mi::{Record, RecordKind, WaitSpec, strip_ansi};
use crate::transport::Transport;

/// A request to the debugger
#[derive(Debug, Clone)]
pub struct Command {
    pub text: String,
    /// Overrides the runner's default completion predicate
    pub wait: Option<WaitSpec>,
    pub timeout: Duration,
}

impl Command {
    pub fn new(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            wait: None,
            timeout,
        }
    }

    pub fn with_wait(mut self, wait: WaitSpec) -> Self {
        self.wait = Some(wait);
        self
    }
}

/// Records a command produced, up to and including the settling one
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command: String,
    pub records: Vec<Record>,
}

impl CommandOutcome {
    /// Textual output in arrival order
    pub fn text(&self) -> String {
        records_text(&self.records)
    }

    /// The settling record
    pub fn terminal(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Error reported by the debugger for this command, if any
    pub fn error_message(&self) -> Option<&str> {
        self.records.iter().find_map(Record::error_message)
    }

    /// The `*stopped` notification, if execution stopped during this command
    pub fn stop(&self) -> Option<&Record> {
        self.records.iter().find(|r| r.is(RecordKind::Notify, "stopped"))
    }
}

/// Concatenate the textual payload of console/target streams and unknown
/// lines, plus any `^error` message, in arrival order.
///
/// Log-stream records are left out: the debugger echoes each command there.
pub fn records_text(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        match record.kind {
            RecordKind::Stream => out.push_str(record.text().unwrap_or_default()),
            RecordKind::Unknown => {
                out.push_str(record.text().unwrap_or_default());
                out.push('\n');
            }
            RecordKind::Result => {
                if let Some(msg) = record.error_message() {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str("error: ");
                    out.push_str(msg);
                }
            }
            RecordKind::Notify | RecordKind::Log => {}
        }
    }
    out
}

/// Strip escape sequences from every string in a record's payload. `raw` is
/// kept verbatim for audit.
fn sanitize(record: Record) -> Record {
    fn strip_value(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(strip_ansi(&s)),
            Value::Array(items) => Value::Array(items.into_iter().map(strip_value).collect()),
            Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, strip_value(v))).collect()),
            other => other,
        }
    }

    Record {
        payload: strip_value(record.payload),
        ..record
    }
}

/// A command that timed out and may still produce output
struct Pending {
    command: String,
    wait: WaitSpec,
}

struct Channel {
    transport: Box<dyn Transport>,
    pending: Option<Pending>,
}

impl Channel {
    /// Let a timed-out command settle before anything else is written, so its
    /// late records are never read as the next command's output.
    async fn settle_pending(&mut self, log: &SessionLog, poll_interval: Duration, timeout: Duration) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let label = format!("{} (late)", pending.command);
        match correlator::collect(&mut *self.transport, &pending.wait, poll_interval, timeout, &label).await {
            Ok(records) => {
                let records: Vec<Record> = records.into_iter().map(sanitize).collect();
                info!("Earlier command '{}' settled late", pending.command);
                log.note(&format!("Late output of '{}':\n{}", pending.command, records_text(&records)));
                Ok(())
            }
            Err(SleuthError::CorrelationTimeout {
                timeout_ms, records, ..
            }) => {
                warn!("Earlier command '{}' still has not settled", pending.command);
                log.note(&format!("Late output of '{}':\n{}", pending.command, records_text(&records)));
                let command = pending.command.clone();
                self.pending = Some(pending);
                Err(SleuthError::CorrelationTimeout {
                    command,
                    timeout_ms,
                    records: Vec::new(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Discard lines that are already buffered but belong to no command
    async fn discard_stray(&mut self) -> Result<()> {
        while let Some(line) = self.transport.read_line(Duration::ZERO).await? {
            if let Some(record) = Record::decode(&line) {
                debug!("Discarding stray output: {}", record.raw);
            }
        }
        Ok(())
    }
}

/// Serializes commands against a single transport
pub struct CommandRunner {
    channel: Mutex<Channel>,
    log: SessionLog,
    settings: CorrelatorConfig,
}

impl CommandRunner {
    pub fn new(transport: Box<dyn Transport>, log: SessionLog, settings: CorrelatorConfig) -> Self {
        Self {
            channel: Mutex::new(Channel {
                transport,
                pending: None,
            }),
            log,
            settings,
        }
    }

    /// Completion predicate used when a command brings no override. A command
    /// the debugger rejects settles on its `^error`.
    pub fn default_wait() -> WaitSpec {
        WaitSpec::settled().with(RecordKind::Result, "error")
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn settings(&self) -> &CorrelatorConfig {
        &self.settings
    }

    /// Run a command with the default predicate and timeout
    pub async fn run(&self, text: &str) -> Result<CommandOutcome> {
        self.run_with(Command::new(text, self.settings.command_timeout())).await
    }

    /// Submit one command and wait for it to settle.
    ///
    /// If an earlier command timed out, it is given `command.timeout` to settle
    /// first. When it still has not, this command is not sent and the result is
    /// a `CorrelationTimeout` naming the earlier command.
    pub async fn run_with(&self, command: Command) -> Result<CommandOutcome> {
        let wait = command.wait.clone().unwrap_or_else(Self::default_wait);
        self.log.command_started(&command.text);
        info!("Running debugger command: {}", command.text);

        let result = {
            let mut channel = self.channel.lock().await;
            self.send(&mut channel, &command, &wait).await
        };

        match result {
            Ok(records) => {
                let outcome = CommandOutcome {
                    command: command.text.clone(),
                    records: records.into_iter().map(sanitize).collect(),
                };
                self.log.command_finished(&command.text, &outcome.text());
                debug!("Command '{}' settled on {:?}", command.text, outcome.terminal().map(|r| r.to_string()));
                Ok(outcome)
            }
            Err(SleuthError::CorrelationTimeout {
                command: label,
                timeout_ms,
                records,
            }) => {
                let records: Vec<Record> = records.into_iter().map(sanitize).collect();
                let partial = records_text(&records);
                let err = SleuthError::CorrelationTimeout {
                    command: label,
                    timeout_ms,
                    records,
                };
                self.log.command_failed(&command.text, &format!("{}\n{}", err, partial));
                Err(err)
            }
            Err(e) => {
                self.log.command_failed(&command.text, &e.to_string());
                Err(e)
            }
        }
    }

    async fn send(&self, channel: &mut Channel, command: &Command, wait: &WaitSpec) -> Result<Vec<Record>> {
        let poll_interval = self.settings.poll_interval();
        channel.settle_pending(&self.log, poll_interval, command.timeout).await?;
        channel.discard_stray().await?;
        channel.transport.write_line(&command.text).await?;

        let result = correlator::collect(&mut *channel.transport, wait, poll_interval, command.timeout, &command.text).await;
        if matches!(result, Err(SleuthError::CorrelationTimeout { .. })) {
            channel.pending = Some(Pending {
                command: command.text.clone(),
                wait: wait.clone(),
            });
        }
        result
    }

    /// Wait for `spec` without writing anything (session start-up)
    pub async fn wait_for(&self, spec: &WaitSpec, timeout: Duration, label: &str) -> Result<Vec<Record>> {
        let mut channel = self.channel.lock().await;
        let records =
            correlator::collect(&mut *channel.transport, spec, self.settings.poll_interval(), timeout, label).await?;
        Ok(records.into_iter().map(sanitize).collect())
    }

    /// Send the exit command and release the transport
    pub async fn shutdown(&self) -> Result<()> {
        let mut channel = self.channel.lock().await;
        self.log.note("Closing debugger session");
        channel.transport.shutdown().await
    }
}
