//! Web UI: ledger upload and conversion, symbol analysis and CSV download.

pub mod handlers;
pub mod templates;

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tera::Tera;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::core::config::{AppConfig, DataPaths};
use crate::market::MarketData;

/// Shared by every request. Each handler draws its own connection from the
/// store pool behind `market`.
pub struct AppState {
    pub market: Arc<MarketData>,
    pub config: AppConfig,
    pub paths: DataPaths,
    pub templates: Tera,
}

impl AppState {
    pub fn new(market: Arc<MarketData>, config: AppConfig, paths: DataPaths) -> Result<Self> {
        Ok(AppState {
            market,
            config,
            paths,
            templates: templates::load_templates()?,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let images = ServeDir::new(&state.paths.images_dir);
    Router::new()
        .route("/", get(handlers::index))
        .route("/converted", post(handlers::converted))
        .route("/analysis/{symbol}", get(handlers::analysis))
        .route("/download", get(handlers::download))
        .nest_service("/images", images)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
