//! Session log - append-only audit trail of executed debugger commands
//!
//! Every command is written before it runs and its result or error after, so
//! a crash mid-command still leaves a record of what was attempted.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use log::warn;

use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One executed command as kept in the in-memory history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub at: DateTime<Local>,
    pub command: String,
    pub outcome: std::result::Result<String, String>,
}

impl HistoryEntry {
    /// Render as the tagged block fed back to models and written to the log
    pub fn render(&self) -> String {
        match &self.outcome {
            Ok(result) => format!(
                "<gdb_command><command>{}</command><command_result>{}</command_result></gdb_command>",
                self.command, result
            ),
            Err(error) => format!(
                "<gdb_command><command>{}</command><command_error>{}</command_error></gdb_command>",
                self.command, error
            ),
        }
    }
}

#[derive(Default)]
struct Inner {
    file: Option<File>,
    history: Vec<HistoryEntry>,
}

/// Shared, cloneable handle to the session log
#[derive(Clone, Default)]
pub struct SessionLog {
    inner: Arc<Mutex<Inner>>,
}

impl SessionLog {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                file: Some(file),
                history: Vec::new(),
            })),
        })
    }

    /// A log that keeps history in memory but writes nothing to disk
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn command_started(&self, command: &str) {
        self.write_line("INFO", &format!("Executing command: {}", command));
    }

    pub fn command_finished(&self, command: &str, result: &str) {
        self.write_line("INFO", &format!("Result of {}:\n{}", command, result));
        self.push(command, Ok(result.to_string()));
    }

    pub fn command_failed(&self, command: &str, error: &str) {
        let message = format!("Error executing command '{}': {}", command, error);
        self.write_line("ERROR", &message);
        self.push(command, Err(message));
    }

    /// Free-form line, e.g. the question being analyzed
    pub fn note(&self, message: &str) {
        self.write_line("INFO", message);
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        match self.inner.lock() {
            Ok(inner) => inner.history.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// All history entries rendered, one per line
    pub fn render_history(&self) -> String {
        self.history().iter().map(HistoryEntry::render).collect::<Vec<_>>().join("\n")
    }

    fn push(&self, command: &str, outcome: std::result::Result<String, String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.history.push(HistoryEntry {
                at: Local::now(),
                command: command.to_string(),
                outcome,
            });
        }
    }

    fn write_line(&self, level: &str, message: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if let Some(file) = inner.file.as_mut() {
            let stamp = Local::now().format(TIMESTAMP_FORMAT);
            if let Err(e) = writeln!(file, "{} - {} - {}", stamp, level, message).and_then(|_| file.flush()) {
                warn!("Failed to write session log: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_timestamped_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.log");
        let log = SessionLog::open(&path).unwrap();

        log.command_started("bt 128");
        log.command_finished("bt 128", "#0 main () at x.c:3");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert!(lines[0].ends_with(" - INFO - Executing command: bt 128"));
        assert!(lines[1].contains(" - INFO - Result of bt 128:"));
        assert_eq!(lines[2], "#0 main () at x.c:3");
        // "YYYY-MM-DD HH:MM:SS - "
        assert_eq!(&lines[0][4..5], "-");
        assert_eq!(&lines[0][19..22], " - ");
    }

    #[test]
    fn test_appends_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.log");
        SessionLog::open(&path).unwrap().note("first");
        SessionLog::open(&path).unwrap().note("second");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("first"));
        assert!(content.contains("second"));
    }

    #[test]
    fn test_history_render() {
        let log = SessionLog::disabled();
        log.command_finished("p x", "$1 = 3");
        log.command_failed("p nope", "No symbol \"nope\" in current context.");

        let history = log.history();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[0].render(),
            "<gdb_command><command>p x</command><command_result>$1 = 3</command_result></gdb_command>"
        );
        assert!(history[1].render().contains("<command_error>Error executing command 'p nope'"));
        assert_eq!(log.render_history().lines().count(), 2);
    }

    #[test]
    fn test_started_alone_not_in_history() {
        let log = SessionLog::disabled();
        log.command_started("c");
        assert!(log.history().is_empty());
    }

    #[test]
    fn test_clones_share_history() {
        let log = SessionLog::disabled();
        let clone = log.clone();
        clone.command_finished("info threads", "* 1 Thread 0x1");
        assert_eq!(log.history().len(), 1);
    }
}
