//! Exchange rate abstractions

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::error::FetchResult;

/// Historical USD based exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Units of `currency` one US dollar bought on `date`.
    async fn usd_rate(&self, currency: &str, date: NaiveDate) -> FetchResult<f64>;
}

/// Three upper-case ASCII letters, e.g. `JPY`.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}
