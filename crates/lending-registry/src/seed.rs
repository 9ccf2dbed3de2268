//! Sample catalog used by the console and the simulation commands.

use tracing::{debug, info};

use lending_entity::item::NewItem;
use lending_entity::member::NewMember;

use crate::manager::LibraryManager;

/// Loads three items and three members.
///
/// Items are upserted; members that already exist are left alone, so
/// seeding twice is harmless.
pub async fn seed_sample_data(registry: &dyn LibraryManager) {
    let items = [
        NewItem::new(1, "1984", "George Orwell"),
        NewItem::new(2, "The Hobbit", "J.R.R. Tolkien"),
        NewItem::new(3, "Clean Code", "Robert C. Martin"),
    ];
    for item in items {
        registry.add_item(item).await;
    }

    let members = [
        NewMember::new(1, "Alice"),
        NewMember::new(2, "Bob"),
        NewMember::new(3, "Carol"),
    ];
    for member in members {
        let member_id = member.id;
        if let Err(e) = registry.add_member(member).await {
            debug!(member_id = %member_id, error = %e, "Sample member already present");
        }
    }

    info!("Sample data seeded");
}
