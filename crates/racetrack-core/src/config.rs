//! Race Configuration
//!
//! One serde-friendly structure covering the remote store location and the
//! page sizes of the garage and winners views. Front-ends embed it in their own
//! file format.

use core::time::Duration;

use url::Url;

use crate::errors::{RaceError, RaceResult};

// ----------------------------------------------------------------------------
// Server Configuration
// ----------------------------------------------------------------------------

/// Location of the remote REST store
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the garage/engine/winners endpoints
    pub base_url: String,
    /// Per-request timeout in milliseconds, 0 disables it
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_ms: 0,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Parse `base_url`, accepting only http(s).
    pub fn parsed_base_url(&self) -> RaceResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| RaceError::Configuration {
            reason: format!("invalid base_url {:?}: {e}", self.base_url),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(RaceError::Configuration {
                reason: format!("base_url scheme must be http or https, got {other}"),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// View Configuration
// ----------------------------------------------------------------------------

/// Garage view settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GarageConfig {
    /// Cars per garage page
    pub page_size: u32,
    /// Cars created by one "generate" intent
    pub generate_count: usize,
}

impl Default for GarageConfig {
    fn default() -> Self {
        Self {
            page_size: 7,
            generate_count: 100,
        }
    }
}

/// Winners view settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WinnersConfig {
    /// Rows per winners page
    pub page_size: u32,
}

impl Default for WinnersConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

// ----------------------------------------------------------------------------
// Master Configuration
// ----------------------------------------------------------------------------

/// Complete race core configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub server: ServerConfig,
    pub garage: GarageConfig,
    pub winners: WinnersConfig,
}

impl RaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local json-server on the default port
    pub fn local() -> Self {
        Self::default()
    }

    /// Small pages and a short generate run, for tests
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            garage: GarageConfig {
                page_size: 3,
                generate_count: 5,
            },
            winners: WinnersConfig { page_size: 3 },
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.server.base_url = base_url.into();
        self
    }

    pub fn with_garage(mut self, garage: GarageConfig) -> Self {
        self.garage = garage;
        self
    }

    pub fn with_winners(mut self, winners: WinnersConfig) -> Self {
        self.winners = winners;
        self
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> RaceResult<()> {
        if self.garage.page_size == 0 {
            return Err(RaceError::Configuration {
                reason: "garage page size cannot be zero".to_string(),
            });
        }
        if self.winners.page_size == 0 {
            return Err(RaceError::Configuration {
                reason: "winners page size cannot be zero".to_string(),
            });
        }
        self.server.parsed_base_url()?;
        Ok(())
    }
}
