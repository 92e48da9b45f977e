//! Racetrack CLI Configuration Management
//!
//! Configuration is read from a TOML file (`--config`, or `racetrack.toml` in
//! the user config directory when present), then overridden by `RACETRACK_*`
//! environment variables and finally by command line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use racetrack_core::RaceConfig;

use crate::error::{CliError, Result};

pub const ENV_BASE_URL: &str = "RACETRACK_BASE_URL";
pub const ENV_OFFLINE: &str = "RACETRACK_OFFLINE";

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the Racetrack CLI application
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Race core configuration
    pub race: RaceConfig,

    /// CLI-specific configuration
    pub cli: CliConfig,
}

/// CLI-specific configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Enable verbose logging output
    pub verbose: bool,

    /// Use the in-process simulated store instead of the HTTP server
    pub offline: bool,

    /// Cars the simulated store starts with
    pub simulated_cars: usize,

    /// Seed for the simulated store and car generator
    pub seed: Option<u64>,

    /// Prompt of the interactive mode
    pub prompt: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            offline: false,
            simulated_cars: 4,
            seed: None,
            prompt: "racetrack> ".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the user configuration file if one exists, defaults otherwise
    pub fn load_default() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/racetrack/racetrack.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("racetrack").join("racetrack.toml"))
    }

    /// Apply `RACETRACK_BASE_URL` and `RACETRACK_OFFLINE`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_OFFLINE).ok(),
        );
    }

    fn apply_overrides(&mut self, base_url: Option<String>, offline: Option<String>) {
        if let Some(base_url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.race.server.base_url = base_url;
        }
        if let Some(offline) = offline {
            self.cli.offline = matches!(
                offline.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), toml_string)?;
        Ok(())
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        self.race
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        if self.cli.prompt.is_empty() {
            return Err(CliError::Config("Prompt cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        let example_config = AppConfig {
            cli: CliConfig {
                seed: Some(42),
                ..CliConfig::default()
            },
            ..Default::default()
        };

        toml::to_string_pretty(&example_config)
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();
        assert!(!config.cli.verbose);
        assert!(!config.cli.offline);
        assert_eq!(config.cli.prompt, "racetrack> ");
        assert_eq!(config.race.garage.page_size, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_roundtrips() {
        let example = AppConfig::example_config();
        assert!(example.contains("[race.server]"));
        assert!(example.contains("[cli]"));

        let parsed: AppConfig = toml::from_str(&example).unwrap();
        assert_eq!(parsed.cli.seed, Some(42));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [race.winners]
            page_size = 5

            [cli]
            offline = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.race.winners.page_size, 5);
        assert_eq!(parsed.race.garage.page_size, 7);
        assert!(parsed.cli.offline);
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("http://10.0.0.2:3000".to_string()), Some("TRUE".to_string()));
        assert_eq!(config.race.server.base_url, "http://10.0.0.2:3000");
        assert!(config.cli.offline);

        config.apply_overrides(Some("  ".to_string()), Some("0".to_string()));
        assert_eq!(config.race.server.base_url, "http://10.0.0.2:3000");
        assert!(!config.cli.offline);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.race.garage.page_size = 0;
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "racetrack-config-test-{}.toml",
            std::process::id()
        ));
        let mut config = AppConfig::default();
        config.cli.simulated_cars = 9;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }
}
