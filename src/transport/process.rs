//! Transport backed by a spawned `rr replay` process

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Transport;
use crate::error::{Result, SleuthError};
use crate::mi::EXIT_COMMAND;

/// How long to wait for the process to exit after the exit command
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Debugger front-end running as a child process, spoken to over stdin/stdout
pub struct ProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: mpsc::UnboundedReceiver<String>,
    reader: JoinHandle<()>,
}

impl ProcessTransport {
    /// Spawn `program args...` with piped stdin/stdout; stderr goes to the terminal
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        info!("Spawning debugger: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SleuthError::Transport(format!("Failed to spawn '{}': {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SleuthError::Transport("missing stdin pipe for debugger process".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SleuthError::Transport("missing stdout pipe for debugger process".to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(reader_loop(stdout, tx));

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines: rx,
            reader,
        })
    }
}

async fn reader_loop(stdout: ChildStdout, tx: mpsc::UnboundedSender<String>) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("Debugger stdout reached EOF");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed reading debugger stdout: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SleuthError::Transport("debugger stdin already closed".to_string()))?;

        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        stdin
            .write_all(&bytes)
            .await
            .map_err(|e| SleuthError::Transport(format!("Failed to write '{}': {}", line, e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| SleuthError::Transport(format!("Failed to flush '{}': {}", line, e)))?;
        Ok(())
    }

    async fn read_line(&mut self, wait: Duration) -> Result<Option<String>> {
        match tokio::time::timeout(wait, self.lines.recv()).await {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => Err(SleuthError::Transport("debugger output closed".to_string())),
            Err(_) => Ok(None),
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.stdin.is_some() {
            if let Err(e) = self.write_line(EXIT_COMMAND).await {
                warn!("Exit command not delivered: {}", e);
            }
        }
        self.stdin = None;

        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => info!("Debugger exited with {}", status),
            Ok(Err(e)) => warn!("Failed waiting for debugger exit: {}", e),
            Err(_) => {
                warn!("Debugger did not exit within {:?}, killing it", EXIT_GRACE);
                self.child.kill().await?;
            }
        }
        self.reader.abort();
        Ok(())
    }
}
