//! Quarterly earnings per share

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::core::error::FetchResult;

/// Number of quarters kept per company.
pub const EPS_QUARTERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpsQuarter {
    pub fiscal_date: NaiveDate,
    pub reported: Option<f64>,
    pub expected: Option<f64>,
}

/// Four most recent quarters, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpsRecord {
    pub symbol: String,
    pub quarters: [EpsQuarter; EPS_QUARTERS],
    pub last_update: NaiveDate,
}

#[async_trait]
pub trait EarningsProvider: Send + Sync {
    /// Returns exactly [`EPS_QUARTERS`] quarters, newest first.
    async fn fetch_quarters(&self, symbol: &str) -> FetchResult<[EpsQuarter; EPS_QUARTERS]>;
}
