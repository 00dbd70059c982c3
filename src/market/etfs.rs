use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use super::cached::{Cached, CachedEntity};
use crate::core::error::FetchResult;
use crate::core::freshness::{ETF_FRESHNESS, Freshness};
use crate::core::listing::{EtfSet, ListingProvider};
use crate::store::Store;

/// The whole ETF list, refilled at once when it ages out.
pub struct EtfEntity {
    pub(crate) store: Store,
    pub(crate) provider: Arc<dyn ListingProvider>,
}

#[async_trait]
impl CachedEntity for EtfEntity {
    type Key = ();
    type Value = EtfSet;

    const NAME: &'static str = "etf list";

    fn freshness(&self) -> Freshness {
        ETF_FRESHNESS
    }

    async fn load(&self, _key: &()) -> FetchResult<Option<Cached<EtfSet>>> {
        let set = self.store.all_etfs().await?;
        if set.etfs.is_empty() {
            return Ok(None);
        }
        let last_update = set.last_update;
        Ok(Some(Cached {
            value: set,
            last_update,
        }))
    }

    async fn refresh(&self, _key: &(), today: NaiveDate) -> FetchResult<()> {
        let etfs = self.provider.fetch_etfs().await?;
        self.store.replace_etfs(&etfs, today).await?;
        info!("Fetched {} ETFs", etfs.len());
        Ok(())
    }
}
