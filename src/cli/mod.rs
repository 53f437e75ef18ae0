//! CLI module for rrsleuth - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for one-shot analysis,
//! running debugger commands, and the interactive console.

pub mod commands;
pub mod console;

pub use commands::{Cli, Commands};
pub use console::ConsoleInput;
