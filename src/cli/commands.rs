//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - analyze: answer one question about the recorded execution
//! - exec: run debugger commands and print their output
//! - console: interactive session (the default)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rrsleuth::config::Config;

/// rrsleuth - ask a language model to investigate an rr recording
#[derive(Parser, Debug)]
#[command(name = "rrsleuth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Trace directory to replay (rr picks the latest when omitted)
    #[arg(short, long, global = true)]
    pub trace_dir: Option<PathBuf>,

    /// Base directory for relative source paths
    #[arg(short, long, global = true)]
    pub source_root: Option<PathBuf>,

    /// Cap on reasoning calls per question
    #[arg(long, global = true)]
    pub max_iterations: Option<u32>,

    /// Model (or Azure deployment) to use
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Apply command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.trace_dir {
            config.debugger.trace_dir = Some(dir.clone());
        }
        if let Some(root) = &self.source_root {
            config.debugger.source_root = Some(root.clone());
        }
        if let Some(max) = self.max_iterations {
            config.agent.max_iterations = max;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Answer a question about the recorded execution
    Analyze {
        /// The question, e.g. "Why did the program crash?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Run debugger commands in order and print their output
    Exec {
        /// Commands, one per argument, e.g. "bt 128" "info locals"
        #[arg(required = true, num_args = 1..)]
        commands: Vec<String>,
    },

    /// Interactive console (default)
    Console,
}
