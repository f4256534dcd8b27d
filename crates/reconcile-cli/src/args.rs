use std::fmt;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Parser)]
#[command(name = "reconcile")]
#[command(about = "Reconcile engagement data across messaging sources, Coda, and analysis exports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the pipeline config TOML. Falls back to $RECONCILE_CONFIG, then
    /// ~/.reconcile/config.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Override the cache directory the pipeline's watermarks are read from / written to.
    #[arg(long, global = true)]
    pub incremental_cache_path: Option<String>,

    /// Report what would happen without writing to the engagement database, the cache, or
    /// the coding tool.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Pull new records from an upstream source into the engagement database")]
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },

    #[command(about = "Project coded messages into an analysis CSV export")]
    EngagementDbToAnalysis {
        /// Destination path for the CSV file. Writes to stdout if omitted.
        #[arg(long)]
        output: Option<String>,

        /// One row per participant instead of one row per message.
        #[arg(long)]
        per_participant: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommand {
    #[command(about = "Sync a configured flow platform's result fields into the engagement database")]
    FlowToEngagementDb,

    #[command(about = "Sync a configured web form's answers into the engagement database")]
    WebFormToEngagementDb,

    #[command(about = "Sync a configured messaging group's posts into the engagement database")]
    GroupToEngagementDb,

    #[command(about = "Forward-sync live engagement-db messages to the coding tool")]
    EngagementDbToCoda {
        /// Skip reconciling Coda users and code schemes before forward-syncing messages.
        #[arg(long)]
        skip_updating_coda_users_and_code_schemes: bool,
    },

    #[command(about = "Back-sync coder labels from the coding tool onto the engagement database")]
    CodaToEngagementDb,
}
