//! Brokerage ledger parsing and conversion into a foreign currency.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::currency::{RateProvider, is_currency_code};

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brokerage {
    /// Title line, header, lots, then three footer lines. `$1,234.00`
    /// amounts and `MM/DD/YYYY` dates.
    Firstrade,
    /// Header on the first line, plain numbers and ISO dates.
    Generic,
}

impl FromStr for Brokerage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firstrade" => Ok(Brokerage::Firstrade),
            "generic" => Ok(Brokerage::Generic),
            _ => Err(anyhow!("Unsupported brokerage: {}", s)),
        }
    }
}

impl Display for Brokerage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Brokerage::Firstrade => "firstrade",
                Brokerage::Generic => "generic",
            }
        )
    }
}

impl Brokerage {
    fn sales_column(&self) -> &'static str {
        match self {
            Brokerage::Firstrade => "Sales Proceeds",
            Brokerage::Generic => "Sales",
        }
    }

    fn date_format(&self) -> &'static str {
        match self {
            Brokerage::Firstrade => "%m/%d/%Y",
            Brokerage::Generic => "%Y-%m-%d",
        }
    }
}

/// One closed lot in US dollars.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub symbol: String,
    pub quantity: f64,
    pub date_acquired: NaiveDate,
    pub date_sold: NaiveDate,
    pub sales: f64,
    pub cost: f64,
}

/// A lot with its rates and converted amounts. Field names are the column
/// names of the page table and the CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedLot {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Quantity")]
    pub quantity: f64,
    #[serde(rename = "Date Acquired")]
    pub date_acquired: NaiveDate,
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "Rate Acquired")]
    pub rate_acquired: f64,
    #[serde(rename = "Converted Cost")]
    pub converted_cost: f64,
    #[serde(rename = "Date Sold")]
    pub date_sold: NaiveDate,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Rate Sold")]
    pub rate_sold: f64,
    #[serde(rename = "Converted Sales")]
    pub converted_sales: f64,
    #[serde(rename = "Gain&Loss")]
    pub gain_loss: f64,
}

impl ConvertedLot {
    pub fn new(lot: &Lot, rate_acquired: f64, rate_sold: f64) -> Self {
        let rate_acquired = round2(rate_acquired);
        let rate_sold = round2(rate_sold);
        let converted_cost = round2(lot.cost * rate_acquired);
        let converted_sales = round2(lot.sales * rate_sold);
        ConvertedLot {
            symbol: lot.symbol.clone(),
            quantity: lot.quantity,
            date_acquired: lot.date_acquired,
            cost: lot.cost,
            rate_acquired,
            converted_cost,
            date_sold: lot.date_sold,
            sales: lot.sales,
            rate_sold,
            converted_sales,
            gain_loss: round2(converted_sales - converted_cost),
        }
    }
}

fn clean_amount(value: &str) -> Result<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    cleaned
        .parse::<f64>()
        .with_context(|| format!("Invalid amount: {value:?}"))
}

fn column(header: &csv::StringRecord, name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Missing column: {}", name))
}

/// Parses an uploaded ledger into lots.
pub fn parse_ledger(data: &[u8], brokerage: Brokerage) -> Result<Vec<Lot>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read ledger CSV")?;

    if brokerage == Brokerage::Firstrade {
        if records.len() < 5 {
            bail!("Firstrade ledger is too short: {} lines", records.len());
        }
        records.remove(0);
        records.truncate(records.len() - 3);
    }
    if records.is_empty() {
        bail!("Ledger has no header");
    }
    let header = records.remove(0);

    let symbol = column(&header, "Symbol")?;
    let quantity = column(&header, "Quantity")?;
    let acquired = column(&header, "Date Acquired")?;
    let sold = column(&header, "Date Sold")?;
    let sales = column(&header, brokerage.sales_column())?;
    let cost = column(&header, "Cost")?;

    let field = |record: &csv::StringRecord, idx: usize, line: usize| -> Result<String> {
        record
            .get(idx)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| anyhow!("Row {} is missing column {}", line, header.get(idx).unwrap_or("?")))
    };
    let date = |value: &str| -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value, brokerage.date_format())
            .with_context(|| format!("Invalid date: {value:?}"))
    };

    let lots = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.iter().any(|v| !v.trim().is_empty()))
        .map(|(i, record)| -> Result<Lot> {
            let line = i + 1;
            Ok(Lot {
                symbol: field(record, symbol, line)?,
                quantity: clean_amount(&field(record, quantity, line)?)?,
                date_acquired: date(&field(record, acquired, line)?)?,
                date_sold: date(&field(record, sold, line)?)?,
                sales: clean_amount(&field(record, sales, line)?)?,
                cost: clean_amount(&field(record, cost, line)?)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} lots from {} ledger", lots.len(), brokerage);
    Ok(lots)
}

/// Converts every lot at the USD rates of its acquisition and disposal days,
/// sorted by symbol then disposal date. `on_rate` is called after each rate
/// lookup.
pub async fn convert_lots(
    lots: &[Lot],
    currency: &str,
    rates: &dyn RateProvider,
    mut on_rate: impl FnMut() + Send,
) -> Result<Vec<ConvertedLot>> {
    if !is_currency_code(currency) {
        bail!("Unsupported currency code: {}", currency);
    }

    let mut converted = Vec::with_capacity(lots.len());
    for lot in lots {
        let rate_acquired = rates
            .usd_rate(currency, lot.date_acquired)
            .await
            .with_context(|| format!("Rate lookup failed for {} {}", lot.symbol, lot.date_acquired))?;
        on_rate();
        let rate_sold = rates
            .usd_rate(currency, lot.date_sold)
            .await
            .with_context(|| format!("Rate lookup failed for {} {}", lot.symbol, lot.date_sold))?;
        on_rate();
        converted.push(ConvertedLot::new(lot, rate_acquired, rate_sold));
    }
    converted.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.date_sold.cmp(&b.date_sold))
    });

    info!("Converted {} lots to {}", converted.len(), currency);
    Ok(converted)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub lots: usize,
    pub total_gain_loss: f64,
    pub tax_year: Option<i32>,
}

/// The tax year is the year of the earliest disposal.
pub fn tax_year(lots: &[ConvertedLot]) -> Option<i32> {
    lots.iter().map(|lot| lot.date_sold).min().map(|d| d.year())
}

pub fn summarize(lots: &[ConvertedLot]) -> LedgerSummary {
    LedgerSummary {
        lots: lots.len(),
        total_gain_loss: round2(lots.iter().map(|lot| lot.gain_loss).sum()),
        tax_year: tax_year(lots),
    }
}
