//! Reservation expiry.
//!
//! Each successful reservation spawns one task that sleeps for the
//! reservation TTL, re-enters the registry lock and clears the reservation
//! only if it is still the very reservation the task was created for.
//! Borrowing or cancelling aborts the task, but the re-validation is what
//! keeps a late firing from touching a newer reservation.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time;
use tracing::{debug, info, trace};

use lending_core::types::id::{ItemId, MemberId};

use crate::registry::RegistryState;

/// Handle to a pending expiry task.
#[derive(Debug)]
pub(crate) struct ExpiryHandle {
    /// Ticket of the reservation this task expires.
    ticket: u64,
    /// Abort handle of the spawned task.
    abort: AbortHandle,
}

impl ExpiryHandle {
    /// Ticket of the reservation this task belongs to.
    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Stops the task if it has not fired yet.
    pub(crate) fn cancel(self) {
        self.abort.abort();
    }
}

/// What an expiry firing did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpiryOutcome {
    /// The reservation was still current and has been cleared.
    Expired,
    /// The world moved on; nothing was changed.
    Stale,
}

/// Spawns the expiry task for a freshly recorded reservation.
///
/// The task only holds a weak reference, so a dropped registry ends it.
pub(crate) fn schedule(
    state: &Arc<Mutex<RegistryState>>,
    item_id: ItemId,
    holder: MemberId,
    ticket: u64,
    ttl: Duration,
) -> ExpiryHandle {
    let weak: Weak<Mutex<RegistryState>> = Arc::downgrade(state);

    let task = tokio::spawn(async move {
        time::sleep(ttl).await;

        let Some(state) = weak.upgrade() else {
            trace!(item_id = %item_id, "Registry gone before reservation expiry");
            return;
        };
        let mut state = state.lock().await;
        state.expire_reservation(item_id, holder, ticket);
    });

    ExpiryHandle {
        ticket,
        abort: task.abort_handle(),
    }
}

impl RegistryState {
    /// Clears the reservation identified by `ticket` if it is still
    /// outstanding, still held by `holder`, and the item is not borrowed.
    pub(crate) fn expire_reservation(
        &mut self,
        item_id: ItemId,
        holder: MemberId,
        ticket: u64,
    ) -> ExpiryOutcome {
        let still_current = self
            .reservations
            .get(&item_id)
            .is_some_and(|r| r.holder == holder && r.ticket == ticket);
        let borrowed = self
            .items
            .get(&item_id)
            .is_none_or(|item| item.is_borrowed());

        if !still_current || borrowed {
            debug!(
                item_id = %item_id,
                member_id = %holder,
                ticket,
                "Skipping stale reservation expiry"
            );
            return ExpiryOutcome::Stale;
        }

        self.reservations.remove(&item_id);
        if let Some(item) = self.items.get_mut(&item_id) {
            item.reservation = None;
        }
        if self
            .timers
            .get(&item_id)
            .is_some_and(|handle| handle.ticket() == ticket)
        {
            self.timers.remove(&item_id);
        }

        info!(item_id = %item_id, member_id = %holder, "Reservation auto-cancelled");
        ExpiryOutcome::Expired
    }
}
