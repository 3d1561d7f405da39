use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "greenhouse",
    version,
    about = "Greenhouse monitor with threshold alerts and irrigation pump control"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the monitoring loop until Ctrl-C (default)
    Run {
        /// Seed the simulated sensor for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Export recent measurements as JSON
    Export {
        /// Destination file (defaults to export.path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of most recent measurements (defaults to export.limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show recent measurements
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show recent alerts
    Alerts {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect or change runtime parameters
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List the threshold rules in evaluation order
    Rules,
    /// Write a config file interactively
    Init,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// List every stored parameter
    List,
    /// Print one parameter
    Get { name: String },
    /// Set a parameter (takes effect on the next cycle)
    Set { name: String, value: String },
}
