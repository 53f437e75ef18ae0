//! Debugger session - exclusive owner of the transport and command runner
//!
//! A session is started by spawning the replay front-end and waiting for the
//! replay to stop at its first event. After that, commands run one at a time.

mod log;
mod runner;

pub use self::log::{HistoryEntry, SessionLog};
pub use self::runner::{Command, CommandOutcome, CommandRunner, records_text};

use ::log::info;

use crate::config::{CorrelatorConfig, DebuggerConfig};
use crate::error::Result;
use crate::mi::{Record, WaitSpec};
use crate::transport::{ProcessTransport, Transport};

pub struct Session {
    runner: CommandRunner,
    startup: Vec<Record>,
}

impl Session {
    /// Spawn the replay front-end and wait until it is ready
    pub async fn start(debugger: &DebuggerConfig, correlator: &CorrelatorConfig, log: SessionLog) -> Result<Self> {
        let transport = ProcessTransport::spawn(&debugger.program, &debugger.command_line())?;
        Self::attach(Box::new(transport), correlator.clone(), log).await
    }

    /// Wrap an existing transport and wait until it is ready
    pub async fn attach(transport: Box<dyn Transport>, settings: CorrelatorConfig, log: SessionLog) -> Result<Self> {
        let ready_timeout = settings.ready_timeout();
        let runner = CommandRunner::new(transport, log, settings);
        let startup = runner.wait_for(&WaitSpec::ready(), ready_timeout, "startup").await?;
        info!("Debugger session ready after {} records", startup.len());
        runner.log().note("Debugger session ready");
        Ok(Self { runner, startup })
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Records seen while waiting for the session to become ready
    pub fn startup_records(&self) -> &[Record] {
        &self.startup
    }

    /// Text printed during start-up (banner, symbol loading, replay position)
    pub fn startup_text(&self) -> String {
        records_text(&self.startup)
    }

    pub async fn run(&self, command: &str) -> Result<CommandOutcome> {
        self.runner.run(command).await
    }

    pub fn log(&self) -> &SessionLog {
        self.runner.log()
    }

    /// Ask the debugger to exit
    pub async fn close(self) -> Result<()> {
        self.runner.shutdown().await
    }
}
