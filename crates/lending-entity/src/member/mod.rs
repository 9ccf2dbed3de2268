//! Member entities.

pub mod model;

pub use model::{Member, NewMember};
