use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use super::cached::{Cached, CachedEntity};
use crate::core::earnings::{EarningsProvider, EpsRecord};
use crate::core::error::FetchResult;
use crate::core::freshness::{EPS_FRESHNESS, Freshness};
use crate::store::Store;

/// Four-quarter EPS record per company.
///
/// The upstream is queried before the stored row is touched, so a throttled
/// refresh leaves the previous record in place.
pub struct EpsEntity {
    pub(crate) store: Store,
    pub(crate) provider: Arc<dyn EarningsProvider>,
}

#[async_trait]
impl CachedEntity for EpsEntity {
    type Key = String;
    type Value = EpsRecord;

    const NAME: &'static str = "eps";

    fn freshness(&self) -> Freshness {
        EPS_FRESHNESS
    }

    async fn load(&self, symbol: &String) -> FetchResult<Option<Cached<EpsRecord>>> {
        Ok(self.store.eps(symbol).await?.map(|record| {
            let last_update = Some(record.last_update);
            Cached {
                value: record,
                last_update,
            }
        }))
    }

    async fn refresh(&self, symbol: &String, today: NaiveDate) -> FetchResult<()> {
        let quarters = self.provider.fetch_quarters(symbol).await?;
        let record = EpsRecord {
            symbol: symbol.clone(),
            quarters,
            last_update: today,
        };
        self.store.replace_eps(&record).await?;
        Ok(())
    }
}
