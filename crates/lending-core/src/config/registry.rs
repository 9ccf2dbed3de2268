//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for the in-memory lending registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Seconds a reservation stays outstanding before it auto-expires.
    #[serde(default = "default_reservation_ttl")]
    pub reservation_ttl_seconds: u64,
}

impl RegistryConfig {
    /// Reservation lifetime as a [`Duration`].
    pub fn reservation_ttl(&self) -> Duration {
        Duration::from_secs(self.reservation_ttl_seconds)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.reservation_ttl_seconds == 0 {
            return Err(AppError::validation(
                "registry.reservation_ttl_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reservation_ttl_seconds: default_reservation_ttl(),
        }
    }
}

fn default_reservation_ttl() -> u64 {
    5
}
