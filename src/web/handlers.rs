use anyhow::Context as _;
use axum::{
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Datelike;
use serde::Serialize;
use std::sync::Arc;
use tera::Context;
use tracing::{error, info, warn};

use super::AppState;
use crate::core::error::FetchError;
use crate::core::listing::is_ticker;
use crate::report::charts::{self, ChartKind};
use crate::report::{
    Brokerage, cumulative_gain_loss, convert_lots, eps_long, export::write_converted_csv,
    parse_ledger, summarize,
};

const CONVERTED_COLUMNS: [&str; 11] = [
    "Symbol",
    "Quantity",
    "Date Acquired",
    "Cost",
    "Rate Acquired",
    "Converted Cost",
    "Date Sold",
    "Sales",
    "Rate Sold",
    "Converted Sales",
    "Gain&Loss",
];

/// Error pages returned by the handlers.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(symbol) => AppError::NotFound(format!("Unknown symbol: {symbol}")),
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => {
                warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::NotFound(message) => {
                info!("Not found: {}", message);
                (StatusCode::NOT_FOUND, message)
            }
            AppError::Internal(err) => {
                error!("Request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong while preparing this page.".to_string(),
                )
            }
        };
        let page = format!(
            "<!doctype html><html><head><title>{status}</title></head>\
             <body><h1>{status}</h1><p>{}</p><p><a href=\"/\">Back</a></p></body></html>",
            tera::escape_html(&message)
        );
        (status, Html(page)).into_response()
    }
}

type PageResult = Result<Html<String>, AppError>;

fn render(state: &AppState, name: &str, ctx: &Context) -> PageResult {
    let page = state
        .templates
        .render(name, ctx)
        .with_context(|| format!("Failed to render {name}"))?;
    Ok(Html(page))
}

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> PageResult {
    let mut ctx = Context::new();
    ctx.insert("currencies", &state.config.currencies);
    ctx.insert(
        "brokerages",
        &[Brokerage::Firstrade, Brokerage::Generic].map(|b| b.to_string()),
    );
    render(&state, "index.html", &ctx)
}

/// POST /converted
///
/// Converts the uploaded ledger, draws the cumulative chart and replaces the
/// CSV export.
pub async fn converted(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> PageResult {
    let mut file = None;
    let mut brokerage = None;
    let mut currency = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
                file = Some(bytes);
            }
            Some(key @ ("brokerage" | "currency")) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
                if key == "brokerage" {
                    brokerage = Some(value);
                } else {
                    currency = Some(value);
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("No ledger file uploaded".to_string()))?;
    let brokerage: Brokerage = brokerage
        .unwrap_or_default()
        .parse()
        .map_err(|e: anyhow::Error| AppError::BadRequest(e.to_string()))?;
    let currency = currency.unwrap_or_default().trim().to_uppercase();
    if !state.config.supports_currency(&currency) {
        return Err(AppError::BadRequest(format!(
            "Unsupported currency: {currency:?}"
        )));
    }

    let lots = parse_ledger(&file, brokerage)
        .map_err(|e| AppError::BadRequest(format!("Could not read the ledger: {e:#}")))?;
    let converted = convert_lots(&lots, &currency, &*state.market, || {}).await?;
    let summary = summarize(&converted);
    write_converted_csv(&converted, &state.paths.export_csv)?;

    let series = cumulative_gain_loss(&converted);
    let chart = if series.is_empty() {
        None
    } else {
        let images_dir = state.paths.images_dir.clone();
        let stamp = state.market.clock().file_stamp();
        let title = format!(
            "Cumulative gain/loss {} ({})",
            summary.tax_year.unwrap_or_default(),
            currency
        );
        let name = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let (path, name) = charts::prepare_chart(&images_dir, ChartKind::Cumulative, &stamp)?;
            charts::render_cumulative(&series, &title, &path)?;
            Ok(name)
        })
        .await
        .context("Chart task failed")??;
        Some(name)
    };

    let mut ctx = Context::new();
    ctx.insert("currency", &currency);
    ctx.insert("summary", &summary);
    ctx.insert("columns", &CONVERTED_COLUMNS);
    ctx.insert("lots", &converted);
    ctx.insert("chart", &chart);
    render(&state, "converted.html", &ctx)
}

#[derive(Debug, Serialize)]
struct InfoPanel {
    symbol: String,
    name: String,
    exchange: String,
    kind: &'static str,
}

/// GET /analysis/{symbol}
///
/// Info panel, news, price history and EPS for the latest complete year.
pub async fn analysis(State(state): State<Arc<AppState>>, Path(symbol): Path<String>) -> PageResult {
    let symbol = symbol.trim().to_uppercase();
    if !is_ticker(&symbol) {
        return Err(AppError::BadRequest(format!("Invalid symbol: {symbol:?}")));
    }
    let clock = state.market.clock();
    let year = clock.today().year() - 1;
    let stamp = clock.file_stamp();

    let etfs = state.market.etfs().await?;
    let (info, bars, eps) = match etfs.find(&symbol) {
        Some(etf) => {
            let info = InfoPanel {
                symbol: etf.symbol.clone(),
                name: etf.name.clone(),
                exchange: etf.exchange.clone(),
                kind: "ETF",
            };
            let bars = state.market.live_history(&symbol, year).await?;
            (info, bars, None)
        }
        None => {
            // Companies first: History and EPS rows reference them
            let company = state.market.company(&symbol).await?;
            let bars = state.market.history(&symbol, year).await?;
            let eps = state.market.eps(&symbol).await?;
            let info = InfoPanel {
                symbol: company.symbol,
                name: company.name,
                exchange: company.exchange,
                kind: "Company",
            };
            (info, bars, eps)
        }
    };

    let news = match state.market.news(&symbol).await {
        Ok(entry) => entry.map(|e| e.items()).unwrap_or_default(),
        Err(e) => {
            warn!("News for {} unavailable: {}", symbol, e);
            Vec::new()
        }
    };

    let last_close = bars.last().map(|bar| bar.adjusted_close);
    let eps_points = eps.as_ref().map(eps_long).unwrap_or_default();
    let images_dir = state.paths.images_dir.clone();
    let history_title = format!("{symbol} {year}");
    let eps_title = format!("{symbol} EPS");
    let chart_points = eps_points.clone();
    let (history_chart, eps_chart) = tokio::task::spawn_blocking(
        move || -> anyhow::Result<(String, Option<String>)> {
            let (path, history_chart) =
                charts::prepare_chart(&images_dir, ChartKind::History, &stamp)?;
            charts::render_history(&bars, &history_title, &path)?;
            let (path, eps_chart) = charts::prepare_chart(&images_dir, ChartKind::Eps, &stamp)?;
            let eps_chart = if chart_points.is_empty() {
                None
            } else {
                charts::render_eps(&chart_points, &eps_title, &path)?;
                Some(eps_chart)
            };
            Ok((history_chart, eps_chart))
        },
    )
    .await
    .context("Chart task failed")??;

    let mut ctx = Context::new();
    ctx.insert("info", &info);
    ctx.insert("year", &year);
    ctx.insert("last_close", &last_close);
    ctx.insert("history_chart", &history_chart);
    ctx.insert("eps_chart", &eps_chart);
    ctx.insert("eps", &eps_points);
    ctx.insert("news", &news);
    render(&state, "analysis.html", &ctx)
}

/// GET /download
pub async fn download(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let path = &state.paths.export_csv;
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(
                "Nothing converted yet. Upload a ledger first.".to_string(),
            ));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to read {}", path.display()))
                .into());
        }
    };
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"converted.csv\"",
            ),
        ],
        data,
    )
        .into_response())
}
