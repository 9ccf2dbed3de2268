//! Interactive console over a seeded registry.

use std::str::FromStr;
use std::sync::Arc;

use dialoguer::{Confirm, Input, Select};

use crate::output::{self, OutputFormat};
use lending_core::config::AppConfig;
use lending_core::error::{AppError, ErrorKind};
use lending_core::types::id::{ItemId, MemberId};
use lending_entity::item::NewItem;
use lending_entity::member::NewMember;
use lending_registry::{LibraryManager, Registry};
use lending_worker::SimulationParams;

const MENU: [&str; 13] = [
    "Add item",
    "Remove item",
    "Add member",
    "Borrow item",
    "Return item",
    "List available items",
    "List items borrowed by member",
    "Reserve item",
    "Cancel reservation",
    "Simulate concurrent reservations",
    "Show item",
    "Show stats",
    "Exit",
];

/// Execute the console command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let registry = super::seeded_registry(config).await;
    output::print_success("Sample catalog loaded");

    loop {
        println!();
        let choice = Select::new()
            .with_prompt("Lending registry")
            .items(&MENU[..])
            .default(0)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

        if MENU[choice] == "Exit" {
            output::print_success("Goodbye");
            return Ok(());
        }

        // Registry rejections are shown and the menu continues; a broken
        // terminal ends the session.
        if let Err(e) = run_action(choice, &registry, config, format).await {
            if e.is(ErrorKind::Internal) {
                return Err(e);
            }
            output::print_error(&e.to_string());
        }
    }
}

async fn run_action(
    choice: usize,
    registry: &Arc<Registry>,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match choice {
        0 => {
            let id: u64 = prompt("Item id")?;
            let title: String = prompt("Title")?;
            let author: String = prompt("Author")?;
            registry.add_item(NewItem::new(id, title, author)).await;
            output::print_success(&format!("Item {} saved", id));
        }
        1 => {
            let id = item_id()?;
            registry.remove_item(id).await?;
            output::print_success(&format!("Item {} removed", id));
        }
        2 => {
            let id: u64 = prompt("Member id")?;
            let name: String = prompt("Name")?;
            registry.add_member(NewMember::new(id, name)).await?;
            output::print_success(&format!("Member {} added", id));
        }
        3 => {
            let (item, member) = (item_id()?, member_id()?);
            registry.borrow(item, member).await?;
            output::print_success(&format!("Member {} borrowed item {}", member, item));
        }
        4 => {
            let (item, member) = (item_id()?, member_id()?);
            registry.return_item(item, member).await?;
            output::print_success(&format!("Member {} returned item {}", member, item));
        }
        5 => {
            let items = registry.list_available().await;
            output::print_list(&output::item_rows(&items), format);
        }
        6 => {
            let member = member_id()?;
            let items = registry.list_borrowed_by(member).await?;
            output::print_list(&output::item_rows(&items), format);
        }
        7 => {
            let (item, member) = (item_id()?, member_id()?);
            registry.reserve(item, member).await?;
            output::print_success(&format!(
                "Member {} reserved item {} for {}s",
                member,
                item,
                registry.reservation_ttl().as_secs()
            ));
        }
        8 => {
            let (item, member) = (item_id()?, member_id()?);
            registry.cancel_reservation(item, member).await?;
            output::print_success(&format!("Reservation on item {} cancelled", item));
        }
        9 => {
            let item = item_id()?;
            let mut params = SimulationParams::from_config(config, item);
            params.attempts = prompt_with_default("Simulated members", params.attempts)?;
            params.workers = prompt_with_default("Workers", params.workers)?;
            if params.workers == 0 {
                return Err(AppError::validation("Workers must be greater than zero"));
            }
            let observe = Confirm::new()
                .with_prompt(format!(
                    "Wait {}s to watch the reservation expire?",
                    config.simulation.observe_expiry_seconds
                ))
                .default(true)
                .interact()
                .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;
            super::simulate::run_and_report(registry.clone(), &params, config, observe, format)
                .await?;
        }
        10 => {
            let item = registry.get_item(item_id()?).await?;
            output::print_list(&output::item_rows(std::slice::from_ref(&item)), format);
        }
        11 => {
            let stats = registry.stats().await;
            match format {
                OutputFormat::Json => output::print_item(&stats, format),
                OutputFormat::Table => {
                    output::print_kv("Items", &stats.items.to_string());
                    output::print_kv("Available", &stats.available.to_string());
                    output::print_kv("Borrowed", &stats.borrowed.to_string());
                    output::print_kv("Reserved", &stats.reserved.to_string());
                    output::print_kv("Members", &stats.members.to_string());
                    output::print_kv("Pending expiries", &stats.pending_expiries.to_string());
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn prompt<T>(label: &str) -> Result<T, AppError>
where
    T: Clone + ToString + FromStr,
    <T as FromStr>::Err: ToString,
{
    Input::<T>::new()
        .with_prompt(label)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {}", e)))
}

fn prompt_with_default<T>(label: &str, default: T) -> Result<T, AppError>
where
    T: Clone + ToString + FromStr,
    <T as FromStr>::Err: ToString,
{
    Input::<T>::new()
        .with_prompt(label)
        .default(default)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {}", e)))
}

fn item_id() -> Result<ItemId, AppError> {
    prompt::<u64>("Item id").map(ItemId::new)
}

fn member_id() -> Result<MemberId, AppError> {
    prompt::<u64>("Member id").map(MemberId::new)
}
