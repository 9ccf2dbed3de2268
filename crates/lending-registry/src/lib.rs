//! In-memory lending registry.
//!
//! This crate provides:
//! - The [`LibraryManager`] trait describing every catalog operation
//! - [`Registry`], a single-lock implementation safe to share across tasks
//! - Per-reservation expiry tasks that re-validate before cancelling
//! - Sample catalog seeding for demos and tests

mod expiry;
pub mod manager;
pub mod registry;
pub mod seed;

pub use manager::{LibraryManager, RegistryStats};
pub use registry::Registry;
pub use seed::seed_sample_data;
