//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

use racetrack_core::{SortKey, SortOrder};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Base URL of the race server
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Use the in-process simulated server
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show a garage page
    Garage {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Add a car
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "#ffffff")]
        color: String,
    },
    /// Remove a car and its winner record
    Remove { id: String },
    /// Replace a car's name and color
    Update {
        id: String,
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "#ffffff")]
        color: String,
    },
    /// Add random cars
    Generate {
        /// Defaults to the configured generate count
        #[arg(long)]
        count: Option<usize>,
    },
    /// Race the cars of a garage page
    Race {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Return the cars of a garage page to the start
    Reset {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show the winners table
    Winners {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "wins")]
        sort: SortKey,
        #[arg(long, default_value = "desc")]
        order: SortOrder,
    },
    /// Start interactive command-line mode
    Interactive,
    /// Print an example configuration file
    ExampleConfig,
}
