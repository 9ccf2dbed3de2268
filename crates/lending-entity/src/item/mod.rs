//! Catalog item entities.

pub mod model;
pub mod status;

pub use model::{Item, NewItem, ReservationMarker};
pub use status::ItemStatus;
