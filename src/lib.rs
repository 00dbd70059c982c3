pub mod cli;
pub mod core;
pub mod market;
pub mod providers;
pub mod report;
pub mod store;
pub mod web;

use anyhow::{Context, Result};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::market::MarketData;
use crate::providers::Providers;
use crate::report::Brokerage;
use crate::store::Store;
use crate::web::AppState;

pub enum AppCommand {
    Serve,
    Convert {
        file: PathBuf,
        brokerage: Brokerage,
        currency: String,
    },
}

/// Opens the store under the configured data directory and wires every
/// provider behind the cache layer.
pub async fn build_market(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<MarketData> {
    let paths = config.data_paths()?;
    paths.create_dirs()?;
    let store = Store::open(&paths.database)
        .await
        .with_context(|| format!("Failed to open database {}", paths.database.display()))?;
    let providers = Providers::from_config(&config.providers)?;
    Ok(MarketData::new(store, providers, paths.news_cache, clock))
}

/// The web application for `config`, with its own store and caches.
pub async fn build_app(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Router> {
    let market = build_market(&config, clock).await?;
    let paths = config.data_paths()?;
    let state = AppState::new(Arc::new(market), config, paths)?;
    Ok(web::router(Arc::new(state)))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Serve => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let app = build_app(config, Arc::new(SystemClock)).await?;
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!("Serving on http://{}", addr);
            axum::serve(listener, app).await.context("Server stopped")?;
            Ok(())
        }
        AppCommand::Convert {
            file,
            brokerage,
            currency,
        } => {
            let currency = currency.trim().to_uppercase();
            if !config.supports_currency(&currency) {
                anyhow::bail!(
                    "Unsupported currency {currency}, expected one of {}",
                    config.currencies.join(", ")
                );
            }
            let market = build_market(&config, Arc::new(SystemClock)).await?;
            let paths = config.data_paths()?;
            cli::convert::run(&file, brokerage, &currency, &market, &paths).await
        }
    }
}
