//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use lending_core::config::AppConfig;
use lending_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration and summarize it
    Validate,
}

/// Execute config commands
///
/// Loading already validated the configuration, so `validate` only
/// re-checks and reports.
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            output::print_item(config, format);
        }
        ConfigCommand::Validate => match config.validate() {
            Ok(()) => {
                output::print_success(&format!("Configuration '{}' is valid", config_path));
                output::print_kv(
                    "Reservation TTL",
                    &format!("{}s", config.registry.reservation_ttl_seconds),
                );
                output::print_kv("Workers", &config.dispatcher.workers.to_string());
                output::print_kv(
                    "Intake capacity",
                    &config.dispatcher.intake_capacity.to_string(),
                );
                output::print_kv("Simulation attempts", &config.simulation.attempts.to_string());
                output::print_kv("Log level", &config.logging.level);
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
    }

    Ok(())
}
