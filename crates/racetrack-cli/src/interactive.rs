//! Interactive mode command parsing

use core::str::FromStr;

use racetrack_core::{CarId, SortKey};

use crate::error::CliError;

const DEFAULT_COLOR: &str = "#ffffff";

pub const HELP: &str = "\
Garage:  garage | next | prev | page <n> | add <name> [#color] | remove <id>
         select <id> | update <name> [#color] | generate [count]
Engines: start <id> | stop <id> | race | reset
Winners: winners | sort <wins|time> | wnext | wprev
Other:   help | quit";

/// One line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveCommand {
    Garage,
    Next,
    Prev,
    Page(u32),
    Add { name: String, color: String },
    Remove(CarId),
    Select(CarId),
    Update { name: String, color: String },
    Generate(Option<usize>),
    Start(CarId),
    Stop(CarId),
    Race,
    Reset,
    Winners,
    Sort(SortKey),
    WinnersNext,
    WinnersPrev,
    Help,
    Quit,
}

/// Split `<name words...> [#color]`
fn name_and_color(args: &[&str]) -> Result<(String, String), CliError> {
    let (name, color) = match args.split_last() {
        Some((last, rest)) if last.starts_with('#') => (rest.join(" "), last.to_string()),
        _ => (args.join(" "), DEFAULT_COLOR.to_string()),
    };
    if name.is_empty() {
        return Err(CliError::InvalidInput("a car name is required".to_string()));
    }
    Ok((name, color))
}

fn car_id(args: &[&str]) -> Result<CarId, CliError> {
    match args {
        [id] => Ok(CarId::from(*id)),
        _ => Err(CliError::InvalidInput("expected one car id".to_string())),
    }
}

impl FromStr for InteractiveCommand {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((command, args)) = words.split_first() else {
            return Err(CliError::InvalidInput("empty command".to_string()));
        };

        let parsed = match (command.to_ascii_lowercase().as_str(), args) {
            ("garage" | "g", []) => InteractiveCommand::Garage,
            ("next" | "n", []) => InteractiveCommand::Next,
            ("prev" | "p", []) => InteractiveCommand::Prev,
            ("page", [page]) => InteractiveCommand::Page(
                page.parse()
                    .map_err(|_| CliError::InvalidInput(format!("bad page number: {page}")))?,
            ),
            ("add", args) => {
                let (name, color) = name_and_color(args)?;
                InteractiveCommand::Add { name, color }
            }
            ("remove" | "rm", args) => InteractiveCommand::Remove(car_id(args)?),
            ("select", args) => InteractiveCommand::Select(car_id(args)?),
            ("update", args) => {
                let (name, color) = name_and_color(args)?;
                InteractiveCommand::Update { name, color }
            }
            ("generate", []) => InteractiveCommand::Generate(None),
            ("generate", [count]) => InteractiveCommand::Generate(Some(
                count
                    .parse()
                    .map_err(|_| CliError::InvalidInput(format!("bad count: {count}")))?,
            )),
            ("start", args) => InteractiveCommand::Start(car_id(args)?),
            ("stop", args) => InteractiveCommand::Stop(car_id(args)?),
            ("race", []) => InteractiveCommand::Race,
            ("reset", []) => InteractiveCommand::Reset,
            ("winners" | "w", []) => InteractiveCommand::Winners,
            ("sort", [key]) => InteractiveCommand::Sort(key.parse().map_err(CliError::InvalidInput)?),
            ("wnext", []) => InteractiveCommand::WinnersNext,
            ("wprev", []) => InteractiveCommand::WinnersPrev,
            ("help" | "?", []) => InteractiveCommand::Help,
            ("quit" | "exit" | "q", []) => InteractiveCommand::Quit,
            (other, _) => {
                return Err(CliError::InvalidInput(format!(
                    "unknown command or arguments: {other} (try 'help')"
                )))
            }
        };
        Ok(parsed)
    }
}
