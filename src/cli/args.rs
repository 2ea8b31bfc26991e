//! CLI argument definitions using clap
//!
//! Commands:
//! - docshell init --config <path>
//! - docshell start --config <path>
//! - docshell exec --config <path> <command>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docshell - a guarded shell-command interpreter for document collections
#[derive(Parser, Debug)]
#[command(name = "docshell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./docshell.json")]
        config: PathBuf,
    },

    /// Start the HTTP server
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./docshell.json")]
        config: PathBuf,
    },

    /// Execute a single command against a fresh in-memory store and exit
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./docshell.json")]
        config: PathBuf,

        /// The command, e.g. "db.events.find({status:'open'})"
        command: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
