//! Shopkeep application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the SQLite database (and optionally seed the sample catalog)
//! 3. Build the chat turn pipeline from configuration
//! 4. Start the axum REST API server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use shopkeep_api::routes;
use shopkeep_api::state::AppState;
use shopkeep_core::config::ShopkeepConfig;
use shopkeep_storage::{seed_sample_catalog, Database};

use crate::cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ShopkeepConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Shopkeep v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    let db_path = data_dir.join("shopkeep.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    if args.seed {
        let summary = seed_sample_catalog(&db)?;
        tracing::info!(
            categories = summary.categories,
            products = summary.products,
            "Seed finished"
        );
    }

    if !config.chat.enabled {
        tracing::warn!("Chat is disabled in config; message endpoint will return 503");
    }

    // === API server ===

    let state = AppState::from_config(config.clone(), db);

    if let Err(e) = routes::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!(
            "Is another instance running? Try: SHOPKEEP_PORT={} shopkeep",
            config.server.port.saturating_add(1)
        );
        return Err(e.into());
    }

    Ok(())
}
