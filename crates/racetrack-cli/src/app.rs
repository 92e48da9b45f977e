//! Racetrack application wiring: configuration in, ready garage out

use std::sync::Arc;

use tracing::info;

use racetrack_core::{EventBus, RemoteStore};
use racetrack_runtime::{CarGenerator, Garage, MemoryStore};

use crate::config::AppConfig;
use crate::error::Result;
use crate::presenter::EventPresenter;

/// Garage plus the configuration it was built from
pub struct RacetrackApp {
    pub garage: Garage,
    pub config: AppConfig,
}

impl RacetrackApp {
    /// Build the garage against the HTTP server, or the simulated store when
    /// `cli.offline` is set. Events are printed to stdout.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_bus(config, EventBus::shared(), true)
    }

    /// Like [`RacetrackApp::new`] but on a caller-supplied bus
    pub fn with_bus(config: AppConfig, events: Arc<EventBus>, present: bool) -> Result<Self> {
        config.validate()?;

        if present {
            EventPresenter::attach(&events);
        }

        let mut builder = Garage::builder()
            .with_config(config.race.clone())
            .with_event_bus(events)
            .with_event_logging(config.cli.verbose);
        if let Some(seed) = config.cli.seed {
            builder = builder.with_seed(seed);
        }
        if config.cli.offline {
            builder = builder.with_store(simulated_store(&config));
        }

        let garage = builder.build()?;
        info!(
            offline = config.cli.offline,
            base_url = %config.race.server.base_url,
            "racetrack app initialized"
        );
        Ok(Self { garage, config })
    }
}

/// In-process store pre-filled with `cli.simulated_cars` random cars
fn simulated_store(config: &AppConfig) -> Arc<dyn RemoteStore> {
    let (store, mut generator) = match config.cli.seed {
        Some(seed) => (MemoryStore::with_seed(seed), CarGenerator::with_seed(seed)),
        None => (MemoryStore::new(), CarGenerator::from_entropy()),
    };
    for car in generator.cars(config.cli.simulated_cars) {
        store.insert_car(car);
    }
    Arc::new(store)
}
