use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use super::cached::{Cached, CachedEntity};
use crate::core::error::FetchResult;
use crate::core::freshness::Freshness;
use crate::core::listing::{Company, ListingProvider};
use crate::store::Store;

/// Company profiles. Looked up once and kept forever.
pub struct CompanyEntity {
    pub(crate) store: Store,
    pub(crate) provider: Arc<dyn ListingProvider>,
}

#[async_trait]
impl CachedEntity for CompanyEntity {
    type Key = String;
    type Value = Company;

    const NAME: &'static str = "company";

    fn freshness(&self) -> Freshness {
        Freshness::Permanent
    }

    async fn load(&self, symbol: &String) -> FetchResult<Option<Cached<Company>>> {
        Ok(self.store.company(symbol).await?.map(Cached::permanent))
    }

    async fn refresh(&self, symbol: &String, _today: NaiveDate) -> FetchResult<()> {
        let company = self.provider.fetch_company(symbol).await?;
        self.store.insert_company(&company).await?;
        Ok(())
    }
}
