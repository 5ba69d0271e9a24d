//! CLI interface for fx-pilot
//!
//! Provides subcommands for:
//! - `run`: Start the autonomous trading loop
//! - `status`: Show current state
//! - `config`: Show configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fx-pilot")]
#[command(about = "Autonomous forex trading agent")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the autonomous trading loop
    Run(RunArgs),
    /// Show current state
    Status,
    /// Show configuration
    Config,
}
