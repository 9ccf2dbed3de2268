//! Reservation request processing for the lending registry.
//!
//! This crate provides:
//! - A fixed-size worker pool that drains a shared intake queue into the registry
//! - Per-request reply slots that never block a worker
//! - A driver that races simulated members for one item through the pool

pub mod dispatcher;
pub mod request;
pub mod simulation;

pub use dispatcher::{DispatchError, IntakeHandle, ReservationDispatcher};
pub use request::{ReplyReceiver, ReservationRequest};
pub use simulation::{ReservationOutcome, SimulationParams, SimulationReport, run_simulation};
