//! Tracing subscriber for the event bus

use std::sync::Arc;

use tracing::debug;

use racetrack_core::{AppEvent, EventBus};

/// Logs every published event at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLogger;

impl EventLogger {
    /// Register the logger as a wildcard handler on `bus`.
    pub fn attach(bus: &Arc<EventBus>) {
        bus.subscribe_all(|event| EventLogger.log(event));
    }

    pub fn log(&self, event: &AppEvent) {
        match event {
            AppEvent::EngineRunning { car_id, elapsed_ms } => {
                debug!(event = "engine-running", car = %car_id, elapsed_ms);
            }
            AppEvent::WinnerDeclared { car_id, name, time_ms } => {
                debug!(event = "winner-declared", car = %car_id, name = %name, time_ms);
            }
            AppEvent::Diagnostic { message } => {
                debug!(event = "diagnostic", message = %message);
            }
            other => debug!(event = other.kind().as_str(), payload = ?other),
        }
    }
}
