//! Member entity model.

use serde::{Deserialize, Serialize};

use lending_core::types::id::{ItemId, MemberId};

/// A registered member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Unique member identifier.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Items currently borrowed, in borrow order.
    pub borrowed_items: Vec<ItemId>,
}

impl Member {
    /// Check whether the member currently holds the given item.
    pub fn has_borrowed(&self, item_id: ItemId) -> bool {
        self.borrowed_items.contains(&item_id)
    }
}

/// Data required to register a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    /// Member identifier chosen by the caller.
    pub id: MemberId,
    /// Display name.
    pub name: String,
}

impl NewMember {
    /// Build a new member description.
    pub fn new(id: impl Into<MemberId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Turn the description into a member with nothing borrowed.
    pub fn into_member(self) -> Member {
        Member {
            id: self.id,
            name: self.name,
            borrowed_items: Vec::new(),
        }
    }
}
