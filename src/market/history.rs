use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use super::cached::{Cached, CachedEntity};
use crate::core::error::FetchResult;
use crate::core::freshness::Freshness;
use crate::core::price::{HistoryProvider, PriceBar};
use crate::store::Store;

/// Keeps only the bars of `year` from a full series, oldest first.
pub fn bars_for_year(mut bars: Vec<PriceBar>, year: i32) -> Vec<PriceBar> {
    bars.retain(|bar| bar.year() == year);
    bars.sort_by_key(|bar| bar.date);
    bars
}

/// Daily bars per (symbol, year). A year holding any row for the symbol is
/// treated as complete.
pub struct HistoryEntity {
    pub(crate) store: Store,
    pub(crate) provider: Arc<dyn HistoryProvider>,
}

#[async_trait]
impl CachedEntity for HistoryEntity {
    type Key = (String, i32);
    type Value = Vec<PriceBar>;

    const NAME: &'static str = "history";

    fn freshness(&self) -> Freshness {
        Freshness::Permanent
    }

    async fn load(&self, key: &Self::Key) -> FetchResult<Option<Cached<Vec<PriceBar>>>> {
        let (symbol, year) = key;
        let bars = self.store.history(symbol, *year).await?;
        if bars.is_empty() {
            return Ok(None);
        }
        Ok(Some(Cached::permanent(bars)))
    }

    async fn refresh(&self, key: &Self::Key, _today: NaiveDate) -> FetchResult<()> {
        let (symbol, year) = key;
        let bars = bars_for_year(self.provider.fetch_daily(symbol).await?, *year);
        if bars.is_empty() {
            info!("No {} bars for {}", year, symbol);
            return Ok(());
        }
        self.store.insert_history(symbol, &bars).await?;
        Ok(())
    }
}
