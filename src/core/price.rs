//! Daily price bars

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::core::error::FetchResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adjusted_close: f64,
    /// `adjusted_close / close`, the split and dividend factor of the day.
    pub ratio: f64,
}

impl PriceBar {
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
        adjusted_close: f64,
    ) -> Self {
        let ratio = if close == 0.0 {
            1.0
        } else {
            adjusted_close / close
        };
        PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume,
            adjusted_close,
            ratio,
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Scales open, high and low by the ratio and replaces close with the
    /// adjusted close.
    pub fn adjusted(&self) -> PriceBar {
        PriceBar {
            open: self.open * self.ratio,
            high: self.high * self.ratio,
            low: self.low * self.ratio,
            close: self.adjusted_close,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Full daily adjusted series for `symbol`, in no particular order.
    async fn fetch_daily(&self, symbol: &str) -> FetchResult<Vec<PriceBar>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_and_adjustment() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
        let bar = PriceBar::new(date, 98.0, 102.0, 96.0, 100.0, 1_000, 95.0);
        assert!((bar.ratio - 0.95).abs() < 1e-9);

        let adjusted = bar.adjusted();
        assert!((adjusted.open - 93.1).abs() < 1e-9);
        assert!((adjusted.high - 96.9).abs() < 1e-9);
        assert!((adjusted.low - 91.2).abs() < 1e-9);
        assert_eq!(adjusted.close, 95.0);
        assert_eq!(adjusted.volume, 1_000);
        assert_eq!(adjusted.year(), 2020);
    }

    #[test]
    fn test_zero_close_keeps_prices() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
        let bar = PriceBar::new(date, 1.0, 1.0, 1.0, 0.0, 0, 0.0);
        assert_eq!(bar.ratio, 1.0);
    }
}
