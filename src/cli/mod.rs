//! CLI interface for pumpwatch
//!
//! Provides subcommands for:
//! - `run`: Start the detector (`--once` for a single cycle)
//! - `check`: Validate the configuration and exit
//! - `config`: Print the effective configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pumpwatch")]
#[command(about = "Pump and dump detector for crypto perpetual futures")]
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
    /// Start the detector
    Run(RunArgs),
    /// Validate the configuration and exit
    Check,
    /// Print the effective configuration
    Config,
}
