//! # lending-entity
//!
//! Domain entity models for the lending registry. Every struct here is a
//! plain value: the registry owns the authoritative copies and hands out
//! clones, so nothing in this crate carries interior mutability.

pub mod item;
pub mod member;

pub use item::{Item, ItemStatus, NewItem, ReservationMarker};
pub use member::{Member, NewMember};
