//! Library manager trait and shared types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lending_core::result::AppResult;
use lending_core::types::id::{ItemId, MemberId};
use lending_entity::item::{Item, NewItem};
use lending_entity::member::{Member, NewMember};

/// Point-in-time counters over the registry contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Items in the catalog.
    pub items: usize,
    /// Items with `Available` status, reserved or not.
    pub available: usize,
    /// Items currently borrowed.
    pub borrowed: usize,
    /// Outstanding reservations.
    pub reserved: usize,
    /// Registered members.
    pub members: usize,
    /// Expiry timers still tracked by the registry.
    pub pending_expiries: usize,
}

/// Catalog, membership and lending operations.
///
/// Implementations must apply every operation atomically with respect to
/// all others, including reservation expiry. Returned values are owned
/// copies; mutating them never affects the registry.
#[async_trait]
pub trait LibraryManager: Send + Sync + std::fmt::Debug {
    /// Inserts an item, or replaces the title and author of an existing one.
    async fn add_item(&self, item: NewItem);

    /// Removes an item that is neither borrowed nor reserved.
    async fn remove_item(&self, item_id: ItemId) -> AppResult<()>;

    /// Registers a member with an empty borrowed set.
    async fn add_member(&self, member: NewMember) -> AppResult<()>;

    /// Returns a copy of a member.
    async fn get_member(&self, member_id: MemberId) -> AppResult<Member>;

    /// Returns a copy of an item.
    async fn get_item(&self, item_id: ItemId) -> AppResult<Item>;

    /// Lends an item to a member, consuming the member's own reservation.
    async fn borrow(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()>;

    /// Takes an item back from the member who borrowed it.
    async fn return_item(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()>;

    /// Lists every item whose status is `Available`, in no particular order.
    async fn list_available(&self) -> Vec<Item>;

    /// Lists a member's borrowed items in borrow order.
    async fn list_borrowed_by(&self, member_id: MemberId) -> AppResult<Vec<Item>>;

    /// Places a time-limited reservation on an item.
    ///
    /// Not idempotent: reserving an item that is already reserved fails
    /// with `Conflict` even for the current holder.
    async fn reserve(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()>;

    /// Withdraws a reservation before it expires.
    async fn cancel_reservation(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()>;

    /// Returns current counters.
    async fn stats(&self) -> RegistryStats;
}
