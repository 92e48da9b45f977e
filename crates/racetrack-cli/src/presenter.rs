//! Terminal presentation of events and page snapshots

use std::sync::Arc;

use racetrack_core::{AppEvent, EventBus, RaceOutcome};
use racetrack_runtime::{GarageSnapshot, WinnersSnapshot};

/// Prints every published event as one line on stdout
pub struct EventPresenter;

impl EventPresenter {
    pub fn attach(bus: &Arc<EventBus>) {
        bus.subscribe_all(|event| println!("{}", describe(event)));
    }
}

fn seconds(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}

/// One-line description of an event
pub fn describe(event: &AppEvent) -> String {
    match event {
        AppEvent::CarAdded => "Car added".to_string(),
        AppEvent::CarDeleted => "Car deleted".to_string(),
        AppEvent::CarSelected { name } => format!("Selected {name}"),
        AppEvent::CarUpdated => "Car updated".to_string(),
        AppEvent::CarsGenerated { count } => format!("Generated {count} cars"),
        AppEvent::PageAdvanced { page } | AppEvent::PageRetreated { page } => {
            format!("Page {page}")
        }
        AppEvent::EngineRunning { car_id, elapsed_ms } => {
            format!("Car {car_id} driving, arrives in {}", seconds(*elapsed_ms))
        }
        AppEvent::EngineStopped { car_id } => format!("Car {car_id} stopped"),
        AppEvent::ReturnedToStart { car_id } => format!("Car {car_id} back at the start"),
        AppEvent::WinnersShown {
            sort_key,
            sort_order,
        } => format!("Winners by {sort_key} ({sort_order})"),
        AppEvent::WinnerDeclared { name, time_ms, .. } => {
            format!("{name} went first ({})", seconds(*time_ms))
        }
        AppEvent::Diagnostic { message } => format!("! {message}"),
    }
}

/// Summary line of a finished race
pub fn render_outcome(outcome: &RaceOutcome) -> String {
    match outcome {
        RaceOutcome::Winner(run) => {
            format!("Winner: car {} in {}", run.car_id, seconds(run.elapsed_ms))
        }
        RaceOutcome::NoWinner { attempted: 0, .. } => "No cars on this page".to_string(),
        RaceOutcome::NoWinner { attempted, broken } => {
            format!("No winner: {broken} of {attempted} cars broke down")
        }
    }
}

pub fn render_garage(snapshot: &GarageSnapshot) -> String {
    let mut out = format!(
        "Garage ({} cars) page {}/{}\n",
        snapshot.total_count,
        snapshot.page,
        snapshot.last_page()
    );
    if snapshot.cars.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }
    for car in &snapshot.cars {
        let marker = if snapshot.selected.as_ref() == Some(&car.id) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!(
            "{marker} {:>5}  {:<24} {}\n",
            car.id.as_str(),
            car.name,
            car.color
        ));
    }
    out
}

pub fn render_winners(snapshot: &WinnersSnapshot) -> String {
    let mut out = format!(
        "Winners ({}) page {}/{} by {} {}\n",
        snapshot.total_count,
        snapshot.page,
        snapshot.last_page(),
        snapshot.sort.key,
        snapshot.sort.order
    );
    out.push_str(&format!(
        "  {:>3}  {:<24} {:<8} {:>5}  {:>8}\n",
        "#", "Car", "Color", "Wins", "Best"
    ));
    let offset = (snapshot.page.saturating_sub(1) * snapshot.page_size) as usize;
    for (i, row) in snapshot.rows.iter().enumerate() {
        let (name, color) = match &row.car {
            Some(car) => (car.name.as_str(), car.color.as_str()),
            None => ("(removed)", "-"),
        };
        out.push_str(&format!(
            "  {:>3}  {:<24} {:<8} {:>5}  {:>8}\n",
            offset + i + 1,
            name,
            color,
            row.record.wins,
            seconds(row.record.time)
        ));
    }
    out
}
