//! Concurrent reservation simulation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Defaults for the reservation race simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of simulated members racing for the same item.
    #[serde(default = "default_attempts")]
    pub attempts: usize,
    /// Id of the first simulated member; the rest follow sequentially.
    #[serde(default = "default_first_member_id")]
    pub first_member_id: u64,
    /// Delay in milliseconds between launching consecutive producers.
    #[serde(default = "default_stagger")]
    pub stagger_millis: u64,
    /// Seconds to wait after a run to observe auto-expiry.
    #[serde(default = "default_observe_expiry")]
    pub observe_expiry_seconds: u64,
}

impl SimulationConfig {
    /// Producer stagger as a [`Duration`].
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_millis)
    }

    /// Post-run observation window as a [`Duration`].
    pub fn observe_expiry(&self) -> Duration {
        Duration::from_secs(self.observe_expiry_seconds)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.attempts == 0 {
            return Err(AppError::validation(
                "simulation.attempts must be greater than zero",
            ));
        }
        let last_offset = u64::try_from(self.attempts - 1).unwrap_or(u64::MAX);
        if self.first_member_id.checked_add(last_offset).is_none() {
            return Err(AppError::validation(
                "simulation.first_member_id leaves no room for every simulated member",
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            first_member_id: default_first_member_id(),
            stagger_millis: default_stagger(),
            observe_expiry_seconds: default_observe_expiry(),
        }
    }
}

fn default_attempts() -> usize {
    5
}

fn default_first_member_id() -> u64 {
    100
}

fn default_stagger() -> u64 {
    10
}

fn default_observe_expiry() -> u64 {
    6
}
