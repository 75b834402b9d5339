//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "searchbridge")]
#[command(about = "MCP server bridging a hosted search index", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server on stdio
    Serve,

    /// Execute one search payload and print the response
    Query {
        /// Path to a JSON file with the search payload; stdin when omitted
        #[arg(short, long)]
        payload: Option<PathBuf>,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration
    Show,

    /// Check the configuration for problems
    Validate,

    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
