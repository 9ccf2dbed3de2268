//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use lending_entity::item::Item;
use lending_worker::simulation::{AttemptReport, ReservationOutcome};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Table row for a catalog item
#[derive(Debug, Serialize, Tabled)]
pub struct ItemRow {
    /// Item identifier
    #[tabled(rename = "ID")]
    pub id: u64,
    /// Title
    #[tabled(rename = "Title")]
    pub title: String,
    /// Author
    #[tabled(rename = "Author")]
    pub author: String,
    /// Lending status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Reservation holder, or `-`
    #[tabled(rename = "Reserved By")]
    pub reserved_by: String,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.get(),
            title: item.title.clone(),
            author: item.author.clone(),
            status: item.status.to_string(),
            reserved_by: item
                .reserved_by()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Table row for one simulated reservation attempt
#[derive(Debug, Serialize, Tabled)]
pub struct AttemptRow {
    /// Simulated member
    #[tabled(rename = "Member")]
    pub member_id: u64,
    /// Short outcome label
    #[tabled(rename = "Outcome")]
    pub outcome: String,
    /// Error detail, if any
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl From<&AttemptReport> for AttemptRow {
    fn from(attempt: &AttemptReport) -> Self {
        let (outcome, detail) = match &attempt.outcome {
            ReservationOutcome::Reserved => ("reserved".to_string(), String::new()),
            ReservationOutcome::Rejected { kind, message } => {
                (format!("rejected ({kind})"), message.clone())
            }
            ReservationOutcome::NoResponse => {
                ("no response".to_string(), "timed out".to_string())
            }
        };
        Self {
            member_id: attempt.member_id.get(),
            outcome,
            detail,
        }
    }
}

/// Build item rows in id order
pub fn item_rows(items: &[Item]) -> Vec<ItemRow> {
    let mut rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
    rows.sort_by_key(|r| r.id);
    rows
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}
