//! Command handlers for the Racetrack CLI

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use racetrack_core::{CarId, NewCar, SortKey, SortOrder, SortState};

use crate::app::RacetrackApp;
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::Result;
use crate::interactive::{InteractiveCommand, HELP};
use crate::presenter::{render_garage, render_outcome, render_winners};

/// Command dispatcher that handles all CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command against a ready application
    pub async fn execute(command: Commands, app: &RacetrackApp) -> Result<()> {
        match command {
            Commands::Garage { page } => handle_garage_command(app, page).await,
            Commands::Add { name, color } => handle_add_command(app, name, color).await,
            Commands::Remove { id } => handle_remove_command(app, CarId::from(id)).await,
            Commands::Update { id, name, color } => {
                handle_update_command(app, CarId::from(id), name, color).await
            }
            Commands::Generate { count } => handle_generate_command(app, count).await,
            Commands::Race { page } => handle_race_command(app, page).await,
            Commands::Reset { page } => handle_reset_command(app, page).await,
            Commands::Winners { page, sort, order } => {
                handle_winners_command(app, page, sort, order).await
            }
            Commands::Interactive => run_interactive(app).await,
            Commands::ExampleConfig => {
                println!("{}", AppConfig::example_config());
                Ok(())
            }
        }
    }
}

async fn handle_garage_command(app: &RacetrackApp, page: u32) -> Result<()> {
    app.garage.go_to_page(page).await?;
    print!("{}", render_garage(&app.garage.garage()));
    Ok(())
}

async fn handle_add_command(app: &RacetrackApp, name: String, color: String) -> Result<()> {
    app.garage.load().await?;
    let car = app.garage.add_car(NewCar::new(name, color)).await?;
    println!("Created car {} ({})", car.id, car.name);
    print!("{}", render_garage(&app.garage.garage()));
    Ok(())
}

async fn handle_remove_command(app: &RacetrackApp, id: CarId) -> Result<()> {
    app.garage.load().await?;
    app.garage.remove_car(&id).await?;
    print!("{}", render_garage(&app.garage.garage()));
    Ok(())
}

async fn handle_update_command(
    app: &RacetrackApp,
    id: CarId,
    name: String,
    color: String,
) -> Result<()> {
    app.garage.load().await?;
    app.garage.select_car(&id).await?;
    app.garage.update_car(NewCar::new(name, color)).await?;
    print!("{}", render_garage(&app.garage.garage()));
    Ok(())
}

async fn handle_generate_command(app: &RacetrackApp, count: Option<usize>) -> Result<()> {
    let count = count.unwrap_or(app.config.race.garage.generate_count);
    app.garage.load().await?;
    app.garage.generate_cars(count).await?;
    print!("{}", render_garage(&app.garage.garage()));
    Ok(())
}

async fn handle_race_command(app: &RacetrackApp, page: u32) -> Result<()> {
    app.garage.go_to_page(page).await?;
    let outcome = app.garage.race_all().await;
    println!("{}", render_outcome(&outcome));
    Ok(())
}

async fn handle_reset_command(app: &RacetrackApp, page: u32) -> Result<()> {
    app.garage.go_to_page(page).await?;
    app.garage.reset_all().await;
    Ok(())
}

async fn handle_winners_command(
    app: &RacetrackApp,
    page: u32,
    key: SortKey,
    order: SortOrder,
) -> Result<()> {
    app.garage
        .show_winners_at(page, SortState { key, order })
        .await?;
    print!("{}", render_winners(&app.garage.winners()));
    Ok(())
}

// ----------------------------------------------------------------------------
// Interactive Mode
// ----------------------------------------------------------------------------

fn prompt(text: &str) {
    print!("{text}");
    std::io::stdout().flush().ok();
}

async fn run_interactive(app: &RacetrackApp) -> Result<()> {
    app.garage.load().await?;
    println!("{HELP}");
    print!("{}", render_garage(&app.garage.garage()));
    prompt(&app.config.cli.prompt);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            prompt(&app.config.cli.prompt);
            continue;
        }
        match line.parse::<InteractiveCommand>() {
            Ok(InteractiveCommand::Quit) => break,
            Ok(command) => {
                if let Err(err) = execute_interactive(app, command).await {
                    warn!(error = %err, "command failed");
                    println!("Error: {err}");
                }
            }
            Err(err) => println!("{err}"),
        }
        prompt(&app.config.cli.prompt);
    }

    info!("interactive session ended");
    Ok(())
}

async fn execute_interactive(app: &RacetrackApp, command: InteractiveCommand) -> Result<()> {
    let garage = &app.garage;
    match command {
        InteractiveCommand::Garage => {
            garage.go_to_page(garage.garage().page).await?;
        }
        InteractiveCommand::Next => {
            garage.next_page().await?;
        }
        InteractiveCommand::Prev => {
            garage.prev_page().await?;
        }
        InteractiveCommand::Page(page) => {
            garage.go_to_page(page).await?;
        }
        InteractiveCommand::Add { name, color } => {
            garage.add_car(NewCar::new(name, color)).await?;
        }
        InteractiveCommand::Remove(id) => garage.remove_car(&id).await?,
        InteractiveCommand::Select(id) => {
            garage.select_car(&id).await?;
        }
        InteractiveCommand::Update { name, color } => {
            garage.update_car(NewCar::new(name, color)).await?;
        }
        InteractiveCommand::Generate(count) => {
            let count = count.unwrap_or(app.config.race.garage.generate_count);
            garage.generate_cars(count).await?;
        }
        InteractiveCommand::Start(id) => {
            garage.start_engine(&id).await;
            return Ok(());
        }
        InteractiveCommand::Stop(id) => {
            garage.stop_engine(&id).await;
            return Ok(());
        }
        InteractiveCommand::Race => {
            let outcome = garage.race_all().await;
            println!("{}", render_outcome(&outcome));
            return Ok(());
        }
        InteractiveCommand::Reset => {
            garage.reset_all().await;
            return Ok(());
        }
        InteractiveCommand::Winners => {
            garage.show_winners().await?;
            print!("{}", render_winners(&garage.winners()));
            return Ok(());
        }
        InteractiveCommand::Sort(SortKey::Wins) => {
            garage.sort_by_wins().await?;
            print!("{}", render_winners(&garage.winners()));
            return Ok(());
        }
        InteractiveCommand::Sort(SortKey::Time) => {
            garage.sort_by_time().await?;
            print!("{}", render_winners(&garage.winners()));
            return Ok(());
        }
        InteractiveCommand::WinnersNext => {
            garage.next_winners_page().await?;
            print!("{}", render_winners(&garage.winners()));
            return Ok(());
        }
        InteractiveCommand::WinnersPrev => {
            garage.prev_winners_page().await?;
            print!("{}", render_winners(&garage.winners()));
            return Ok(());
        }
        InteractiveCommand::Help => {
            println!("{HELP}");
            return Ok(());
        }
        InteractiveCommand::Quit => return Ok(()),
    }
    print!("{}", render_garage(&garage.garage()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use racetrack_core::EventBus;

    fn offline_app() -> RacetrackApp {
        let mut config = AppConfig::default();
        config.cli.offline = true;
        config.cli.seed = Some(3);
        config.cli.simulated_cars = 2;
        RacetrackApp::with_bus(config, EventBus::shared(), false).unwrap()
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let app = offline_app();
        CommandDispatcher::execute(
            Commands::Add {
                name: "Volvo".to_string(),
                color: "#00ff00".to_string(),
            },
            &app,
        )
        .await
        .unwrap();
        assert_eq!(app.garage.garage().total_count, 3);

        CommandDispatcher::execute(
            Commands::Remove {
                id: "3".to_string(),
            },
            &app,
        )
        .await
        .unwrap();
        assert_eq!(app.garage.garage().total_count, 2);
    }

    #[tokio::test]
    async fn test_update_replaces_car() {
        let app = offline_app();
        CommandDispatcher::execute(
            Commands::Update {
                id: "1".to_string(),
                name: "Renamed".to_string(),
                color: "#123456".to_string(),
            },
            &app,
        )
        .await
        .unwrap();

        let page = app.garage.garage();
        let car = page.car(&CarId::from(1u64)).unwrap();
        assert_eq!(car.name, "Renamed");
        assert!(page.selected.is_none());
    }

    #[tokio::test]
    async fn test_interactive_commands_drive_the_garage() {
        let app = offline_app();
        app.garage.load().await.unwrap();

        execute_interactive(&app, "generate 8".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(app.garage.garage().total_count, 10);

        execute_interactive(&app, InteractiveCommand::Next)
            .await
            .unwrap();
        assert_eq!(app.garage.garage().page, 2);

        execute_interactive(&app, "sort time".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(app.garage.winners().sort.key, SortKey::Time);
    }

    #[tokio::test]
    async fn test_update_without_selection_fails() {
        let app = offline_app();
        app.garage.load().await.unwrap();
        let result = execute_interactive(
            &app,
            InteractiveCommand::Update {
                name: "Lada".to_string(),
                color: "#ffffff".to_string(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
