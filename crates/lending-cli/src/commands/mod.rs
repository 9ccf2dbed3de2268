//! CLI command definitions and dispatch.

pub mod config;
pub mod console;
pub mod scenario;
pub mod simulate;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use lending_core::config::AppConfig;
use lending_core::error::AppError;
use lending_registry::{Registry, seed_sample_data};

/// Lending registry: catalog, reservations and concurrent reservation races
#[derive(Debug, Parser)]
#[command(name = "lending", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/lending.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Race simulated members for one item through the worker pool
    Simulate(simulate::SimulateArgs),
    /// Walk through the reserve, conflict and borrow scenario
    Scenario,
    /// Interactive menu over a seeded registry
    Console,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Simulate(args) => simulate::execute(args, &config, self.format).await,
            Commands::Scenario => scenario::execute(&config, self.format).await,
            Commands::Console => console::execute(&config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format),
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: build a registry from config and load the sample catalog
pub async fn seeded_registry(config: &AppConfig) -> Arc<Registry> {
    let registry = Arc::new(Registry::from_config(&config.registry));
    seed_sample_data(registry.as_ref()).await;
    registry
}
