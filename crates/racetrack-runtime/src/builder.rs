//! Garage Builder API
//!
//! Builder-style construction for consumers (CLI/tests): pick a store, share an
//! event bus, seed the car generator and get a ready [`Garage`].

use std::sync::Arc;

use tracing::info;

use racetrack_core::{EventBus, RaceConfig, RaceResult, RemoteStore};

use crate::event_log::EventLogger;
use crate::garage::Garage;
use crate::generator::CarGenerator;
use crate::store::HttpStore;

// ----------------------------------------------------------------------------
// Garage Builder
// ----------------------------------------------------------------------------

/// Builder for a [`Garage`]
pub struct GarageBuilder {
    config: RaceConfig,
    store: Option<Arc<dyn RemoteStore>>,
    events: Option<Arc<EventBus>>,
    seed: Option<u64>,
    event_logging: bool,
}

impl GarageBuilder {
    pub fn new() -> Self {
        Self {
            config: RaceConfig::default(),
            store: None,
            events: None,
            seed: None,
            event_logging: false,
        }
    }

    /// Set the race configuration
    pub fn with_config(mut self, config: RaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `store` instead of an HTTP client built from the config
    pub fn with_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Publish on an existing bus
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Seed the random car generator
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Log every published event at debug level
    pub fn with_event_logging(mut self, enabled: bool) -> Self {
        self.event_logging = enabled;
        self
    }

    /// Validate the configuration and assemble the garage
    pub fn build(self) -> RaceResult<Garage> {
        self.config.validate()?;

        let store: Arc<dyn RemoteStore> = match self.store {
            Some(store) => store,
            None => Arc::new(HttpStore::new(&self.config.server)?),
        };
        let events = self.events.unwrap_or_else(EventBus::shared);
        if self.event_logging {
            EventLogger::attach(&events);
        }
        let generator = match self.seed {
            Some(seed) => CarGenerator::with_seed(seed),
            None => CarGenerator::from_entropy(),
        };

        info!(
            garage_page = self.config.garage.page_size,
            winners_page = self.config.winners.page_size,
            "garage ready"
        );
        Ok(Garage::new(self.config, store, events, generator))
    }
}

impl Default for GarageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use racetrack_core::{GarageConfig, RaceError};

    #[test]
    fn test_build_with_memory_store() {
        let garage = GarageBuilder::new()
            .with_config(RaceConfig::for_testing())
            .with_store(Arc::new(MemoryStore::new()))
            .with_seed(3)
            .build()
            .unwrap();
        assert_eq!(garage.garage().page_size, 3);
        assert_eq!(garage.winners().page_size, 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RaceConfig::default().with_garage(GarageConfig {
            page_size: 0,
            generate_count: 1,
        });
        let result = GarageBuilder::new()
            .with_config(config)
            .with_store(Arc::new(MemoryStore::new()))
            .build();
        assert!(matches!(result, Err(RaceError::Configuration { .. })));
    }

    #[test]
    fn test_event_logging_attaches_wildcard_handler() {
        let events = EventBus::shared();
        let _garage = GarageBuilder::new()
            .with_store(Arc::new(MemoryStore::new()))
            .with_event_bus(events.clone())
            .with_event_logging(true)
            .build()
            .unwrap();
        assert_eq!(events.handler_count(racetrack_core::EventKind::CarAdded), 1);
    }
}
