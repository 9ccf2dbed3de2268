//! Scripted walkthrough of the reserve, conflict and borrow path.

use crate::output::{self, OutputFormat};
use lending_core::config::AppConfig;
use lending_core::error::{AppError, ErrorKind};
use lending_core::types::id::{ItemId, MemberId};
use lending_registry::LibraryManager;

const BOOK: ItemId = ItemId::new(1);
const ALICE: MemberId = MemberId::new(1);
const BOB: MemberId = MemberId::new(2);

/// Execute the scenario command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let registry = super::seeded_registry(config).await;

    registry.reserve(BOOK, ALICE).await?;
    output::print_success("Alice reserved '1984'");

    match registry.reserve(BOOK, BOB).await {
        Err(e) if e.is(ErrorKind::Conflict) => {
            output::print_success(&format!("Bob was turned away: {}", e.message));
        }
        Err(e) => return Err(e),
        Ok(()) => {
            return Err(AppError::internal(
                "Bob reserved an item Alice already held",
            ));
        }
    }

    registry.borrow(BOOK, ALICE).await?;
    output::print_success("Alice borrowed '1984'");

    println!();
    println!("Available items:");
    let available = registry.list_available().await;
    output::print_list(&output::item_rows(&available), format);

    println!();
    println!("Borrowed by Alice:");
    let borrowed = registry.list_borrowed_by(ALICE).await?;
    output::print_list(&output::item_rows(&borrowed), format);

    registry.return_item(BOOK, ALICE).await?;
    output::print_success("Alice returned '1984'");

    Ok(())
}
