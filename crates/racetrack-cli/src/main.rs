//! Racetrack CLI entry point

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use racetrack_cli::{
    app::RacetrackApp,
    cli::{Cli, Commands},
    commands::CommandDispatcher,
    config::AppConfig,
    error::Result,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.command == Commands::ExampleConfig {
        println!("{}", AppConfig::example_config());
        return Ok(());
    }

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            setup_logging(cli.verbose);
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    setup_logging(config.cli.verbose);

    let app = match RacetrackApp::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = CommandDispatcher::execute(cli.command, &app).await {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }

    info!("Racetrack CLI exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level; `RUST_LOG` takes precedence
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// File (explicit path or user default), then environment, then flags
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(config_path) => AppConfig::load_from_file(config_path)?,
        None => AppConfig::load_default()?,
    };
    config.apply_env_overrides();

    if let Some(base_url) = &cli.base_url {
        config.race.server.base_url = base_url.clone();
    }
    if cli.offline {
        config.cli.offline = true;
    }
    if cli.verbose {
        config.cli.verbose = true;
    }
    config.validate()?;
    Ok(config)
}
