//! GDB/MI decoding - turns protocol lines into structured records
//!
//! This module provides:
//! - Record and RecordKind for decoded output lines
//! - The MI value grammar (C-strings, tuples, lists)
//! - WaitSpec completion predicates
//! - Terminal escape stripping for text leaving the transport boundary

mod ansi;
mod parser;
mod record;
mod wait;

pub use ansi::strip_ansi;
pub use record::{Record, RecordKind};
pub use wait::WaitSpec;

/// The line the front-end prints when it is ready for the next command
pub const PROMPT: &str = "(gdb)";

/// Command that asks the debugger to exit
pub const EXIT_COMMAND: &str = "-gdb-exit";
