//! rrsleuth - LLM-assisted investigation of rr recordings
//!
//! Drives `rr replay` over the GDB machine interface and lets a reasoning
//! backend run debugger commands and read source files until it can
//! answer a question about the recorded execution.

pub mod agent;
pub mod config;
pub mod correlator;
pub mod error;
pub mod llm;
pub mod mi;
pub mod session;
pub mod tools;
pub mod transport;

pub use error::{Result, SleuthError};
