use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use super::cached::{Cached, CachedEntity};
use crate::core::currency::RateProvider;
use crate::core::error::FetchResult;
use crate::core::freshness::Freshness;
use crate::store::Store;

/// USD rates per (currency, day). Permanent once stored.
pub struct RateEntity {
    pub(crate) store: Store,
    pub(crate) provider: Arc<dyn RateProvider>,
}

#[async_trait]
impl CachedEntity for RateEntity {
    type Key = (String, NaiveDate);
    type Value = f64;

    const NAME: &'static str = "rate";

    fn freshness(&self) -> Freshness {
        Freshness::Permanent
    }

    async fn load(&self, key: &Self::Key) -> FetchResult<Option<Cached<f64>>> {
        let (currency, date) = key;
        Ok(self
            .store
            .rate(currency, *date)
            .await?
            .map(Cached::permanent))
    }

    async fn refresh(&self, key: &Self::Key, _today: NaiveDate) -> FetchResult<()> {
        let (currency, date) = key;
        let rate = self.provider.usd_rate(currency, *date).await?;
        self.store.insert_rate(currency, *date, rate).await?;
        info!("Fetched USD/{} for {}", currency, date);
        Ok(())
    }
}
