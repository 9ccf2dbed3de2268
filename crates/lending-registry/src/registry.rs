//! Single-lock in-memory registry.
//!
//! Items, members, reservations and expiry timers all live in one
//! [`RegistryState`] behind one `tokio::sync::Mutex`. Every public
//! operation, and every expiry task, takes that lock for the whole of its
//! read-validate-mutate sequence, so no operation ever observes another
//! half-applied. The lock is only held for map work.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use lending_core::config::RegistryConfig;
use lending_core::error::AppError;
use lending_core::result::AppResult;
use lending_core::types::id::{ItemId, MemberId};
use lending_entity::item::{Item, ItemStatus, NewItem, ReservationMarker};
use lending_entity::member::{Member, NewMember};

use crate::expiry::{self, ExpiryHandle};
use crate::manager::{LibraryManager, RegistryStats};

/// Bookkeeping for one outstanding reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActiveReservation {
    /// Member holding the reservation.
    pub(crate) holder: MemberId,
    /// Distinguishes successive reservation cycles on the same item.
    pub(crate) ticket: u64,
}

/// Everything guarded by the registry lock.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// Catalog keyed by item id.
    pub(crate) items: HashMap<ItemId, Item>,
    /// Members keyed by member id.
    pub(crate) members: HashMap<MemberId, Member>,
    /// Outstanding reservations keyed by item id.
    pub(crate) reservations: HashMap<ItemId, ActiveReservation>,
    /// Pending expiry tasks keyed by item id.
    pub(crate) timers: HashMap<ItemId, ExpiryHandle>,
    /// Last reservation ticket handed out.
    next_ticket: u64,
}

impl RegistryState {
    /// Inserts a new item or refreshes the descriptive fields of an existing
    /// one. Returns `true` when the item is new.
    fn upsert_item(&mut self, new_item: NewItem) -> bool {
        match self.items.get_mut(&new_item.id) {
            Some(existing) => {
                existing.title = new_item.title;
                existing.author = new_item.author;
                false
            }
            None => {
                self.items.insert(new_item.id, new_item.into_item());
                true
            }
        }
    }

    fn item(&self, item_id: ItemId) -> AppResult<&Item> {
        self.items
            .get(&item_id)
            .ok_or_else(|| AppError::not_found(format!("Item {item_id} not found")))
    }

    fn member(&self, member_id: MemberId) -> AppResult<&Member> {
        self.members
            .get(&member_id)
            .ok_or_else(|| AppError::not_found(format!("Member {member_id} not found")))
    }

    fn remove_item(&mut self, item_id: ItemId) -> AppResult<Item> {
        let item = self.item(item_id)?;
        if item.is_borrowed() {
            return Err(AppError::invalid_state(format!(
                "Cannot remove item {item_id}: it is borrowed"
            )));
        }
        if self.reservations.contains_key(&item_id) {
            return Err(AppError::invalid_state(format!(
                "Cannot remove item {item_id}: it is reserved"
            )));
        }
        self.items
            .remove(&item_id)
            .ok_or_else(|| AppError::not_found(format!("Item {item_id} not found")))
    }

    fn add_member(&mut self, new_member: NewMember) -> AppResult<()> {
        if self.members.contains_key(&new_member.id) {
            return Err(AppError::conflict(format!(
                "Member {} already exists",
                new_member.id
            )));
        }
        self.members.insert(new_member.id, new_member.into_member());
        Ok(())
    }

    fn borrow(&mut self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        let item = self.item(item_id)?;
        self.member(member_id)?;

        if item.is_borrowed() {
            return Err(AppError::invalid_state(format!(
                "Item {item_id} is already borrowed"
            )));
        }
        if let Some(reservation) = self.reservations.get(&item_id) {
            if reservation.holder != member_id {
                return Err(AppError::conflict(format!(
                    "Item {item_id} is reserved by member {}",
                    reservation.holder
                )));
            }
        }

        self.clear_reservation(item_id);

        if let Some(item) = self.items.get_mut(&item_id) {
            item.status = ItemStatus::Borrowed;
        }
        if let Some(member) = self.members.get_mut(&member_id) {
            member.borrowed_items.push(item_id);
        }
        Ok(())
    }

    fn return_item(&mut self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        self.item(item_id)?;
        let member = self.member(member_id)?;

        let position = member
            .borrowed_items
            .iter()
            .position(|id| *id == item_id)
            .ok_or_else(|| {
                AppError::invalid_state(format!(
                    "Member {member_id} has not borrowed item {item_id}"
                ))
            })?;

        if let Some(member) = self.members.get_mut(&member_id) {
            member.borrowed_items.remove(position);
        }
        if let Some(item) = self.items.get_mut(&item_id) {
            item.status = ItemStatus::Available;
        }
        Ok(())
    }

    fn list_available(&self) -> Vec<Item> {
        self.items
            .values()
            .filter(|item| item.is_available())
            .cloned()
            .collect()
    }

    fn list_borrowed_by(&self, member_id: MemberId) -> AppResult<Vec<Item>> {
        let member = self.member(member_id)?;
        Ok(member
            .borrowed_items
            .iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect())
    }

    /// Records a reservation and returns its ticket. The caller schedules
    /// the matching expiry task.
    pub(crate) fn reserve(&mut self, item_id: ItemId, member_id: MemberId) -> AppResult<u64> {
        let item = self.item(item_id)?;
        self.member(member_id)?;

        if item.is_borrowed() {
            return Err(AppError::invalid_state(format!(
                "Item {item_id} is already borrowed"
            )));
        }
        if let Some(existing) = self.reservations.get(&item_id) {
            return Err(AppError::conflict(format!(
                "Item {item_id} already reserved by member {}",
                existing.holder
            )));
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;

        if let Some(item) = self.items.get_mut(&item_id) {
            item.reservation = Some(ReservationMarker {
                holder: member_id,
                reserved_at: Utc::now(),
            });
        }
        self.reservations.insert(
            item_id,
            ActiveReservation {
                holder: member_id,
                ticket,
            },
        );
        Ok(ticket)
    }

    fn cancel_reservation(&mut self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        self.item(item_id)?;
        let reservation = self.reservations.get(&item_id).ok_or_else(|| {
            AppError::invalid_state(format!("Item {item_id} is not reserved"))
        })?;
        if reservation.holder != member_id {
            return Err(AppError::conflict(format!(
                "Item {item_id} is reserved by member {}",
                reservation.holder
            )));
        }
        self.clear_reservation(item_id);
        Ok(())
    }

    /// Drops the reservation entry, the item's marker and the pending
    /// expiry task for an item.
    fn clear_reservation(&mut self, item_id: ItemId) -> Option<ActiveReservation> {
        if let Some(handle) = self.timers.remove(&item_id) {
            handle.cancel();
        }
        if let Some(item) = self.items.get_mut(&item_id) {
            item.reservation = None;
        }
        self.reservations.remove(&item_id)
    }

    fn stats(&self) -> RegistryStats {
        let borrowed = self.items.values().filter(|i| i.is_borrowed()).count();
        RegistryStats {
            items: self.items.len(),
            available: self.items.len() - borrowed,
            borrowed,
            reserved: self.reservations.len(),
            members: self.members.len(),
            pending_expiries: self.timers.len(),
        }
    }
}

/// In-memory lending registry.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Protected registry state.
    state: Arc<Mutex<RegistryState>>,
    /// How long a reservation lives without being converted into a borrow.
    reservation_ttl: Duration,
}

impl Registry {
    /// Creates an empty registry whose reservations expire after `reservation_ttl`.
    pub fn new(reservation_ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            reservation_ttl,
        }
    }

    /// Creates an empty registry from configuration.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.reservation_ttl())
    }

    /// Reservation lifetime applied to new reservations.
    pub fn reservation_ttl(&self) -> Duration {
        self.reservation_ttl
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

#[async_trait]
impl LibraryManager for Registry {
    async fn add_item(&self, item: NewItem) {
        let item_id = item.id;
        let mut state = self.state.lock().await;
        if state.upsert_item(item) {
            info!(item_id = %item_id, "Item added");
        } else {
            info!(item_id = %item_id, "Item details updated");
        }
    }

    async fn remove_item(&self, item_id: ItemId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let removed = state
            .remove_item(item_id)
            .inspect_err(|e| debug!(item_id = %item_id, error = %e, "Item removal rejected"))?;
        info!(item_id = %item_id, title = %removed.title, "Item removed");
        Ok(())
    }

    async fn add_member(&self, member: NewMember) -> AppResult<()> {
        let member_id = member.id;
        let mut state = self.state.lock().await;
        state.add_member(member)?;
        info!(member_id = %member_id, "Member added");
        Ok(())
    }

    async fn get_member(&self, member_id: MemberId) -> AppResult<Member> {
        let state = self.state.lock().await;
        state.member(member_id).cloned()
    }

    async fn get_item(&self, item_id: ItemId) -> AppResult<Item> {
        let state = self.state.lock().await;
        state.item(item_id).cloned()
    }

    async fn borrow(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.borrow(item_id, member_id).inspect_err(|e| {
            debug!(item_id = %item_id, member_id = %member_id, error = %e, "Borrow rejected")
        })?;
        info!(item_id = %item_id, member_id = %member_id, "Item borrowed");
        Ok(())
    }

    async fn return_item(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.return_item(item_id, member_id).inspect_err(|e| {
            debug!(item_id = %item_id, member_id = %member_id, error = %e, "Return rejected")
        })?;
        info!(item_id = %item_id, member_id = %member_id, "Item returned");
        Ok(())
    }

    async fn list_available(&self) -> Vec<Item> {
        let state = self.state.lock().await;
        state.list_available()
    }

    async fn list_borrowed_by(&self, member_id: MemberId) -> AppResult<Vec<Item>> {
        let state = self.state.lock().await;
        state.list_borrowed_by(member_id)
    }

    async fn reserve(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let ticket = state.reserve(item_id, member_id).inspect_err(|e| {
            debug!(item_id = %item_id, member_id = %member_id, error = %e, "Reservation rejected")
        })?;

        let handle = expiry::schedule(
            &self.state,
            item_id,
            member_id,
            ticket,
            self.reservation_ttl,
        );
        if let Some(stale) = state.timers.insert(item_id, handle) {
            stale.cancel();
        }

        info!(
            item_id = %item_id,
            member_id = %member_id,
            ttl_secs = self.reservation_ttl.as_secs_f64(),
            "Item reserved"
        );
        Ok(())
    }

    async fn cancel_reservation(&self, item_id: ItemId, member_id: MemberId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.cancel_reservation(item_id, member_id).inspect_err(|e| {
            debug!(item_id = %item_id, member_id = %member_id, error = %e, "Cancellation rejected")
        })?;
        info!(item_id = %item_id, member_id = %member_id, "Reservation cancelled");
        Ok(())
    }

    async fn stats(&self) -> RegistryStats {
        let state = self.state.lock().await;
        state.stats()
    }
}

#[cfg(test)]
impl Registry {
    /// Runs `f` against the locked state.
    pub(crate) async fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }
}

#[cfg(test)]
impl RegistryState {
    /// Panics if any cross-map invariant is broken.
    pub(crate) fn assert_consistent(&self) {
        for (id, item) in &self.items {
            assert_eq!(
                item.reservation.as_ref().map(|m| m.holder),
                self.reservations.get(id).map(|r| r.holder),
                "marker and reservation entry disagree for item {id}"
            );
            assert!(
                !(item.is_borrowed() && item.is_reserved()),
                "item {id} is borrowed and reserved"
            );
            let holders: Vec<_> = self
                .members
                .values()
                .filter(|m| m.has_borrowed(*id))
                .collect();
            if item.is_borrowed() {
                assert_eq!(holders.len(), 1, "borrowed item {id} must have one borrower");
            } else {
                assert!(holders.is_empty(), "available item {id} held by a member");
            }
        }
        for id in self.timers.keys() {
            assert!(self.reservations.contains_key(id), "timer without reservation for {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lending_core::error::ErrorKind;

    async fn setup() -> Registry {
        let registry = Registry::new(Duration::from_secs(5));
        registry.add_item(NewItem::new(1, "1984", "George Orwell")).await;
        registry.add_item(NewItem::new(2, "The Hobbit", "J.R.R. Tolkien")).await;
        registry.add_member(NewMember::new(1, "Alice")).await.unwrap();
        registry.add_member(NewMember::new(2, "Bob")).await.unwrap();
        registry
    }

    fn item(id: u64) -> ItemId {
        ItemId::new(id)
    }

    fn member(id: u64) -> MemberId {
        MemberId::new(id)
    }

    #[tokio::test]
    async fn test_add_item_upsert_keeps_lending_state() {
        let registry = setup().await;
        registry.borrow(item(1), member(1)).await.unwrap();

        registry.add_item(NewItem::new(1, "Nineteen Eighty-Four", "Orwell")).await;

        let updated = registry.get_item(item(1)).await.unwrap();
        assert_eq!(updated.title, "Nineteen Eighty-Four");
        assert_eq!(updated.status, ItemStatus::Borrowed);
        registry.with_state(|s| s.assert_consistent()).await;
    }

    #[tokio::test]
    async fn test_remove_item_rules() {
        let registry = setup().await;

        let err = registry.remove_item(item(99)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        registry.reserve(item(1), member(1)).await.unwrap();
        let err = registry.remove_item(item(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        registry.borrow(item(1), member(1)).await.unwrap();
        let err = registry.remove_item(item(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        registry.remove_item(item(2)).await.unwrap();
        assert_eq!(
            registry.get_item(item(2)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_add_member_conflict() {
        let registry = setup().await;
        let err = registry
            .add_member(NewMember::new(1, "Alice again"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(registry.get_member(member(1)).await.unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn test_get_member_returns_copy() {
        let registry = setup().await;
        registry.borrow(item(1), member(1)).await.unwrap();

        let mut snapshot = registry.get_member(member(1)).await.unwrap();
        snapshot.borrowed_items.clear();

        let fresh = registry.get_member(member(1)).await.unwrap();
        assert_eq!(fresh.borrowed_items, vec![item(1)]);
    }

    #[tokio::test]
    async fn test_borrow_errors() {
        let registry = setup().await;

        assert_eq!(
            registry.borrow(item(99), member(1)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            registry.borrow(item(1), member(99)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );

        registry.reserve(item(1), member(1)).await.unwrap();
        assert_eq!(
            registry.borrow(item(1), member(2)).await.unwrap_err().kind,
            ErrorKind::Conflict
        );

        registry.borrow(item(1), member(1)).await.unwrap();
        assert_eq!(
            registry.borrow(item(1), member(1)).await.unwrap_err().kind,
            ErrorKind::InvalidState
        );
        registry.with_state(|s| s.assert_consistent()).await;
    }

    #[tokio::test]
    async fn test_borrow_unknown_member_leaves_item_untouched() {
        let registry = setup().await;
        registry.borrow(item(1), member(42)).await.unwrap_err();
        let untouched = registry.get_item(item(1)).await.unwrap();
        assert!(untouched.is_available());
    }

    #[tokio::test]
    async fn test_borrow_stops_expiry_timer() {
        let registry = setup().await;
        registry.reserve(item(1), member(1)).await.unwrap();
        assert_eq!(registry.stats().await.pending_expiries, 1);

        registry.borrow(item(1), member(1)).await.unwrap();

        let stats = registry.stats().await;
        assert_eq!(stats.pending_expiries, 0);
        assert_eq!(stats.reserved, 0);
        assert!(registry.get_item(item(1)).await.unwrap().reservation.is_none());
    }

    #[tokio::test]
    async fn test_return_rules() {
        let registry = setup().await;

        assert_eq!(
            registry.return_item(item(99), member(1)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            registry.return_item(item(1), member(99)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            registry.return_item(item(1), member(1)).await.unwrap_err().kind,
            ErrorKind::InvalidState
        );

        registry.borrow(item(1), member(1)).await.unwrap();
        assert_eq!(
            registry.return_item(item(1), member(2)).await.unwrap_err().kind,
            ErrorKind::InvalidState
        );

        registry.return_item(item(1), member(1)).await.unwrap();
        let returned = registry.get_item(item(1)).await.unwrap();
        assert!(returned.is_available());
        assert!(!returned.is_reserved());
        assert!(registry.list_borrowed_by(member(1)).await.unwrap().is_empty());
        registry.with_state(|s| s.assert_consistent()).await;
    }

    #[tokio::test]
    async fn test_list_borrowed_by_preserves_order() {
        let registry = setup().await;
        registry.add_item(NewItem::new(3, "Clean Code", "Robert C. Martin")).await;

        registry.borrow(item(3), member(1)).await.unwrap();
        registry.borrow(item(1), member(1)).await.unwrap();
        registry.borrow(item(2), member(1)).await.unwrap();

        let ids: Vec<_> = registry
            .list_borrowed_by(member(1))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![item(3), item(1), item(2)]);

        assert_eq!(
            registry.list_borrowed_by(member(99)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_reserve_errors() {
        let registry = setup().await;

        assert_eq!(
            registry.reserve(item(99), member(1)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            registry.reserve(item(1), member(99)).await.unwrap_err().kind,
            ErrorKind::NotFound
        );

        registry.reserve(item(1), member(1)).await.unwrap();
        assert_eq!(
            registry.reserve(item(1), member(1)).await.unwrap_err().kind,
            ErrorKind::Conflict,
            "re-reservation by the holder is not idempotent"
        );

        registry.borrow(item(2), member(2)).await.unwrap();
        assert_eq!(
            registry.reserve(item(2), member(1)).await.unwrap_err().kind,
            ErrorKind::InvalidState
        );
        registry.with_state(|s| s.assert_consistent()).await;
    }

    #[tokio::test]
    async fn test_reserve_records_marker() {
        let registry = setup().await;
        registry.reserve(item(2), member(2)).await.unwrap();

        let reserved = registry.get_item(item(2)).await.unwrap();
        assert_eq!(reserved.reserved_by(), Some(member(2)));
        assert_eq!(reserved.status, ItemStatus::Available);
        registry.with_state(|s| s.assert_consistent()).await;
    }

    #[tokio::test]
    async fn test_cancel_reservation() {
        let registry = setup().await;

        assert_eq!(
            registry.cancel_reservation(item(1), member(1)).await.unwrap_err().kind,
            ErrorKind::InvalidState
        );

        registry.reserve(item(1), member(1)).await.unwrap();
        assert_eq!(
            registry.cancel_reservation(item(1), member(2)).await.unwrap_err().kind,
            ErrorKind::Conflict
        );

        registry.cancel_reservation(item(1), member(1)).await.unwrap();
        let stats = registry.stats().await;
        assert_eq!(stats.reserved, 0);
        assert_eq!(stats.pending_expiries, 0);

        registry.reserve(item(1), member(2)).await.unwrap();
        registry.with_state(|s| s.assert_consistent()).await;
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let registry = setup().await;
        registry.borrow(item(1), member(1)).await.unwrap();
        registry.reserve(item(2), member(2)).await.unwrap();

        let stats = registry.stats().await;
        assert_eq!(
            stats,
            RegistryStats {
                items: 2,
                available: 1,
                borrowed: 1,
                reserved: 1,
                members: 2,
                pending_expiries: 1,
            }
        );
    }
}
