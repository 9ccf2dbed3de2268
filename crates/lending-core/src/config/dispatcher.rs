//! Reservation worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for the reservation dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of concurrent worker tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Capacity of the shared intake queue.
    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,
    /// Seconds a caller waits for a reply before giving up.
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_seconds: u64,
}

impl DispatcherConfig {
    /// Reply wait as a [`Duration`].
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_seconds)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.workers == 0 {
            return Err(AppError::validation(
                "dispatcher.workers must be greater than zero",
            ));
        }
        if self.intake_capacity == 0 {
            return Err(AppError::validation(
                "dispatcher.intake_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            intake_capacity: default_intake_capacity(),
            reply_timeout_seconds: default_reply_timeout(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_intake_capacity() -> usize {
    1
}

fn default_reply_timeout() -> u64 {
    2
}
