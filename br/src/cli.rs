//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Barrage - frame-stepped bullet pattern runner
#[derive(Parser)]
#[command(
    name = "br",
    about = "Run and check bullet-hell pattern scripts on a deterministic tick scheduler",
    version,
    after_help = "Logs are written to: ~/.local/share/barrage/logs/barrage.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a pattern script and print its emissions
    Run {
        /// Pattern script (YAML)
        script: PathBuf,

        /// Maximum number of ticks to simulate (defaults to simulation.max-ticks)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Random seed (defaults to rng.seed)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output format (defaults to output.format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Build every property set in a script and report configuration errors
    Check {
        /// Pattern script (YAML)
        script: PathBuf,
    },
}

/// Output format for run results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => Err(format!("Unknown format: {}. Use: text, json, or table", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Table => write!(f, "table"),
        }
    }
}
