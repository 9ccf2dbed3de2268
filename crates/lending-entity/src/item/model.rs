//! Item entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lending_core::types::id::{ItemId, MemberId};

use super::status::ItemStatus;

/// Outstanding reservation recorded on an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationMarker {
    /// Member holding the reservation.
    pub holder: MemberId,
    /// When the reservation was taken.
    pub reserved_at: DateTime<Utc>,
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item identifier.
    pub id: ItemId,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Current lending status.
    pub status: ItemStatus,
    /// Present only while a reservation is outstanding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ReservationMarker>,
}

impl Item {
    /// Check if the item is on the shelf.
    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }

    /// Check if the item is checked out.
    pub fn is_borrowed(&self) -> bool {
        self.status == ItemStatus::Borrowed
    }

    /// Check if a reservation is outstanding.
    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    /// Member holding the outstanding reservation, if any.
    pub fn reserved_by(&self) -> Option<MemberId> {
        self.reservation.as_ref().map(|r| r.holder)
    }
}

/// Data required to add an item to the catalog.
///
/// Lending state is owned by the registry, so a new item always starts
/// `Available` and unreserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    /// Item identifier chosen by the caller.
    pub id: ItemId,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
}

impl NewItem {
    /// Build a new item description.
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
        }
    }

    /// Turn the description into an `Available`, unreserved item.
    pub fn into_item(self) -> Item {
        Item {
            id: self.id,
            title: self.title,
            author: self.author,
            status: ItemStatus::Available,
            reservation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_starts_available() {
        let item = NewItem::new(1, "1984", "George Orwell").into_item();
        assert!(item.is_available());
        assert!(!item.is_reserved());
        assert_eq!(item.reserved_by(), None);
    }

    #[test]
    fn test_reservation_marker_skipped_when_absent() {
        let item = NewItem::new(2, "The Hobbit", "J.R.R. Tolkien").into_item();
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("reservation").is_none());
        assert_eq!(json["status"], "available");
    }
}
