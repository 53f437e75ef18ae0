//! Line-oriented channel to the debugger front-end
//!
//! The correlator only needs two operations: write one line, and read the next
//! available line if one shows up within a short wait.

mod process;
mod scripted;

pub use process::ProcessTransport;
pub use scripted::{GAP, ScriptedTransport};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A bidirectional line channel to a debugger process
#[async_trait]
pub trait Transport: Send {
    /// Write one command line (the newline is added by the transport)
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Read the next line, or `None` if nothing arrived within `wait`.
    ///
    /// Fails with `SleuthError::Transport` once the channel is closed and drained.
    async fn read_line(&mut self, wait: Duration) -> Result<Option<String>>;

    /// Ask the debugger to exit and release the channel
    async fn shutdown(&mut self) -> Result<()>;
}
