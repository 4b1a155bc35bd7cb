//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// demogen - Augment recorded robot demonstrations into synthetic datasets
#[derive(Parser, Debug)]
#[command(name = "demogen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a synthetic dataset from source episodes
    Generate {
        /// Input source-episode file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output dataset file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override demos per source episode
        #[arg(short, long)]
        demos: Option<usize>,
    },

    /// Show episode counts and parsed stage boundaries of a source file
    Inspect {
        /// Input source-episode file (JSON)
        input: PathBuf,

        /// Show per-frame detail
        #[arg(short, long)]
        detailed: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default output directory for generated datasets
    pub fn datasets_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".demogen").join("datasets"))
            .unwrap_or_else(|| PathBuf::from("datasets"))
    }
}
