pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "PointTracker", about = "Daily Activity Point Tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    Log {
        #[arg(long)]
        limit: Option<usize>,
    },
    Submit {
        #[arg(long)]
        activity: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "Good")]
        approval: String,
    },
    Recap {
        #[arg(long, default_value_t = false)]
        recompute: bool,
    },
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    List,
    Set { name: String, points: i64 },
}
