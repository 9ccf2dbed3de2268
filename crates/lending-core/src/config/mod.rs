//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! an optional TOML file overlaid with `LENDING__*` environment variables.
//! Every section has defaults, so an empty source yields a working setup.

pub mod dispatcher;
pub mod logging;
pub mod registry;
pub mod simulation;

use serde::{Deserialize, Serialize};

pub use self::dispatcher::DispatcherConfig;
pub use self::logging::LoggingConfig;
pub use self::registry::RegistryConfig;
pub use self::simulation::SimulationConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry and reservation settings.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Reservation worker pool settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Concurrent reservation simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// The file is optional. Environment variables use the `LENDING`
    /// prefix and `__` as the section separator, e.g.
    /// `LENDING__DISPATCHER__WORKERS=8`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LENDING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        tracing::debug!(path, "Configuration loaded");
        Ok(loaded)
    }

    /// Reject settings the registry and worker pool cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        self.registry.validate()?;
        self.dispatcher.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.registry.reservation_ttl_seconds, 5);
        assert_eq!(config.dispatcher.workers, 3);
        assert_eq!(config.dispatcher.reply_timeout_seconds, 2);
        assert_eq!(config.simulation.attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("this/path/does/not/exist").unwrap();
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let parsed: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[dispatcher]\nworkers = 8\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(parsed.dispatcher.workers, 8);
        assert_eq!(parsed.dispatcher.intake_capacity, 1);
        assert_eq!(parsed.registry.reservation_ttl_seconds, 5);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = AppConfig::default();
        config.dispatcher.workers = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_member_id_range_must_fit() {
        let mut config = AppConfig::default();
        config.simulation.first_member_id = u64::MAX - 3;
        config.simulation.attempts = 4;
        assert!(config.validate().is_ok());

        config.simulation.attempts = 5;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
