//! CLI command definitions

use crate::core::SuccessPolicy;
use clap::Args;

/// Serve the HTTP API
#[derive(Debug, Args, Clone)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, env = "SEVEN_STATIONS_BIND", default_value = "127.0.0.1:3000")]
    pub bind: String,

    /// Seconds a successful run is served from the cache
    #[arg(long, default_value_t = 3600)]
    pub cache_ttl_secs: i64,

    /// How station failures map onto run success
    #[arg(long, value_enum, default_value_t = PolicyArg::Strict)]
    pub policy: PolicyArg,

    /// Keep runs in memory instead of the history database
    #[arg(long)]
    pub no_history: bool,
}

/// Analyze a text
#[derive(Debug, Args, Clone)]
pub struct AnalyzeCommand {
    /// Path to the text file; reads stdin when omitted
    #[arg(short, long)]
    pub file: Option<String>,

    /// Free-form notes about the text
    #[arg(short, long)]
    pub metadata: Option<String>,

    /// How station failures map onto run success
    #[arg(long, value_enum, default_value_t = PolicyArg::Strict)]
    pub policy: PolicyArg,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Print every line of every station
    #[arg(long)]
    pub full: bool,

    /// Output the run result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show the configured stations
#[derive(Debug, Args, Clone)]
pub struct StationsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show a single run with its report
    #[arg(long)]
    pub run_id: Option<String>,

    /// Print every line of the stored report
    #[arg(long)]
    pub details: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Success policy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyArg {
    Strict,
    Lenient,
}

impl From<PolicyArg> for SuccessPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => SuccessPolicy::Strict,
            PolicyArg::Lenient => SuccessPolicy::Lenient,
        }
    }
}
