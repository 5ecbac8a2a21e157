//! Command-line interface

pub mod commands;
pub mod output;
pub mod terminal_output;

use clap::{Parser, Subcommand};
use commands::{AnalyzeCommand, HistoryCommand, ServeCommand, StationsCommand};
use std::ffi::OsString;

/// Seven-stations dramatic text analysis
#[derive(Debug, Parser, Clone)]
#[command(name = "seven-stations")]
#[command(version)]
#[command(about = "Sequential seven-station analysis of dramatic Arabic text", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a station configuration file (defaults to the built-in stations)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// API key for the generation service
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the generation service
    #[arg(long, global = true, env = "GEMINI_API_BASE")]
    pub endpoint: Option<String>,

    /// Disable the per-model spacing between calls
    #[arg(long, global = true)]
    pub no_throttle: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the HTTP API
    Serve(ServeCommand),

    /// Analyze a text file (or stdin) and print the report
    Analyze(AnalyzeCommand),

    /// Show the configured stations
    Stations(StationsCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
