//! Concurrent reservation simulation command.

use std::sync::Arc;

use clap::Args;

use crate::output::{self, AttemptRow, OutputFormat};
use lending_core::config::AppConfig;
use lending_core::error::{AppError, ErrorKind};
use lending_core::types::id::ItemId;
use lending_registry::LibraryManager;
use lending_worker::{SimulationParams, run_simulation};

/// Arguments for the simulate command
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Item every simulated member tries to reserve
    #[arg(short, long, default_value_t = 1)]
    pub item: u64,

    /// Number of simulated members (defaults to `simulation.attempts`)
    #[arg(short, long)]
    pub attempts: Option<usize>,

    /// Worker pool size (defaults to `dispatcher.workers`)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Wait for the reservation to expire and show availability afterwards
    #[arg(long)]
    pub observe: bool,
}

impl SimulateArgs {
    fn params(&self, config: &AppConfig) -> Result<SimulationParams, AppError> {
        let mut params = SimulationParams::from_config(config, ItemId::new(self.item));
        if let Some(attempts) = self.attempts {
            params.attempts = attempts;
        }
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(AppError::validation("--workers must be greater than zero"));
            }
            params.workers = workers;
        }
        Ok(params)
    }
}

/// Execute the simulate command against a freshly seeded registry
pub async fn execute(
    args: &SimulateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let params = args.params(config)?;
    let registry = super::seeded_registry(config).await;
    run_and_report(registry, &params, config, args.observe, format).await
}

/// Runs one simulation and prints its outcome, optionally watching expiry.
///
/// Shared with the console menu, which simulates against its own registry.
pub async fn run_and_report(
    registry: Arc<dyn LibraryManager>,
    params: &SimulationParams,
    config: &AppConfig,
    observe: bool,
    format: OutputFormat,
) -> Result<(), AppError> {
    let report = run_simulation(Arc::clone(&registry), params).await?;

    match format {
        OutputFormat::Json => output::print_item(&report, format),
        OutputFormat::Table => {
            let rows: Vec<AttemptRow> = report.attempts.iter().map(AttemptRow::from).collect();
            output::print_list(&rows, format);

            let winners = report.winners();
            match winners.as_slice() {
                [winner] => output::print_success(&format!(
                    "Member {} holds the reservation on item {}",
                    winner, report.item_id
                )),
                [] => output::print_warning(&format!(
                    "No member reserved item {}",
                    report.item_id
                )),
                _ => output::print_warning(&format!(
                    "{} members reserved item {}",
                    winners.len(),
                    report.item_id
                )),
            }
            output::print_kv(
                "Conflicts",
                &report.rejected_with(ErrorKind::Conflict).to_string(),
            );
            output::print_kv("No response", &report.no_response().to_string());
        }
    }

    if observe {
        let window = config.simulation.observe_expiry();
        output::print_warning(&format!(
            "Waiting {}s for the reservation to expire...",
            window.as_secs()
        ));
        tokio::time::sleep(window).await;

        let item = registry.get_item(params.item_id).await?;
        if item.is_reserved() {
            output::print_warning(&format!("Item {} is still reserved", item.id));
        } else if item.is_available() {
            output::print_success(&format!("Item {} is available again", item.id));
        }
        let available = registry.list_available().await;
        output::print_list(&output::item_rows(&available), format);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lending_registry::Registry;

    #[tokio::test(start_paused = true)]
    async fn test_observe_waits_out_the_reservation() {
        let config = AppConfig::default();
        let registry = super::super::seeded_registry(&config).await;
        let params = SimulationParams::from_config(&config, ItemId::new(1));

        run_and_report(registry.clone(), &params, &config, true, OutputFormat::Json)
            .await
            .unwrap();

        let item = registry.get_item(ItemId::new(1)).await.unwrap();
        assert!(item.is_available());
        assert!(!item.is_reserved());
        assert_eq!(registry.stats().await.pending_expiries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_observe_reservation_is_still_held() {
        let config = AppConfig::default();
        let registry = Arc::new(Registry::from_config(&config.registry));
        lending_registry::seed_sample_data(registry.as_ref()).await;
        let params = SimulationParams::from_config(&config, ItemId::new(2));

        run_and_report(registry.clone(), &params, &config, false, OutputFormat::Json)
            .await
            .unwrap();

        assert!(registry.get_item(ItemId::new(2)).await.unwrap().is_reserved());
    }

    #[test]
    fn test_zero_workers_flag_rejected() {
        let args = SimulateArgs {
            item: 1,
            attempts: None,
            workers: Some(0),
            observe: false,
        };
        let err = args.params(&AppConfig::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
