//! CLI command definitions for notegen
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};

/// Resolve note class configuration and inspect the options it produces
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Explicit class table (overrides every tier's classes.yaml)
    #[arg(short, long, global = true)]
    pub classes: Option<String>,

    /// Vault directory (overrides config)
    #[arg(long, global = true)]
    pub vault: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format: json (default), yaml, or markdown
    #[arg(short, long, default_value = "json", global = true)]
    pub format: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every class with its parent and root
    List,

    /// Print the resolved configuration of a class
    Resolve {
        /// Class name, e.g. `daily`
        class: String,
    },

    /// Print the prompt options of a class
    Options {
        /// Class name
        class: String,
    },

    /// Print the view options of a class for a note title
    View {
        /// Class name
        class: String,
        /// Title of the note being created, e.g. `2024-W06`
        title: String,
    },

    /// Resolve every class and report problems
    Check,

    /// Re-run `check` whenever a configuration file changes
    Watch,
}
