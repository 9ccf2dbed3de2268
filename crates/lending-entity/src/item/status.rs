//! Item lending status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lending status of a catalog item.
///
/// A reservation is not a status of its own: it is tracked as an optional
/// marker on an `Available` item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// On the shelf.
    #[default]
    Available,
    /// Checked out by a member.
    Borrowed,
}

impl ItemStatus {
    /// Return the status as a display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Borrowed => "Borrowed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
