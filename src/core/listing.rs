//! Listed instruments: exchange traded funds and companies

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::error::FetchResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Etf {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
}

/// The cached ETF list together with the day it was last refilled.
#[derive(Debug, Clone, Default)]
pub struct EtfSet {
    pub etfs: Vec<Etf>,
    pub last_update: Option<NaiveDate>,
}

impl EtfSet {
    pub fn find(&self, symbol: &str) -> Option<&Etf> {
        self.etfs.iter().find(|etf| etf.symbol == symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.find(symbol).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
}

/// Ticker shape accepted from users: ASCII letters and digits plus `.` and
/// `-`, such as `BRK.B` or `RDS-A`. Symbols end up in upstream URL paths.
pub fn is_ticker(symbol: &str) -> bool {
    (1..=12).contains(&symbol.len())
        && symbol
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
}

#[async_trait]
pub trait ListingProvider: Send + Sync {
    async fn fetch_etfs(&self) -> FetchResult<Vec<Etf>>;

    /// Best match for `symbol` from the upstream search.
    async fn fetch_company(&self, symbol: &str) -> FetchResult<Company>;
}
