//! Racetrack CLI library
//!
//! Command parsing, configuration loading, event presentation and the
//! interactive prompt for the `racetrack` binary.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod interactive;
pub mod presenter;

pub use app::RacetrackApp;
pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::AppConfig;
pub use error::{CliError, Result};
