//! Reservation request envelope.

use tokio::sync::oneshot;
use uuid::Uuid;

use lending_core::result::AppResult;
use lending_core::types::id::{ItemId, MemberId};

/// Receiving end of a request's private reply slot.
pub type ReplyReceiver = oneshot::Receiver<AppResult<()>>;

/// A single reservation attempt travelling through the intake queue.
#[derive(Debug)]
pub struct ReservationRequest {
    /// Correlation id for logs.
    pub request_id: Uuid,
    /// Item to reserve.
    pub item_id: ItemId,
    /// Member asking for the reservation.
    pub member_id: MemberId,
    /// Single-slot reply sink; sending into it never blocks.
    pub reply: oneshot::Sender<AppResult<()>>,
}

impl ReservationRequest {
    /// Builds a request together with the receiver its outcome will land in.
    pub fn new(item_id: ItemId, member_id: MemberId) -> (Self, ReplyReceiver) {
        let (reply, receiver) = oneshot::channel();
        let request = Self {
            request_id: Uuid::new_v4(),
            item_id,
            member_id,
            reply,
        };
        (request, receiver)
    }
}
