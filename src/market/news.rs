use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::cached::{Cached, CachedEntity};
use crate::core::error::{FetchResult, StoreError};
use crate::core::freshness::{Freshness, NEWS_FRESHNESS};
use crate::core::news::{NewsEntry, NewsProvider};
use crate::store::json_cache;

/// Headlines per symbol, kept in a JSON file and refetched daily.
pub struct NewsEntity {
    pub(crate) path: PathBuf,
    pub(crate) provider: Arc<dyn NewsProvider>,
    /// Serializes read-modify-write of the shared file across symbols.
    pub(crate) file_lock: Mutex<()>,
}

impl NewsEntity {
    pub fn new(path: PathBuf, provider: Arc<dyn NewsProvider>) -> Self {
        NewsEntity {
            path,
            provider,
            file_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl CachedEntity for NewsEntity {
    type Key = String;
    type Value = NewsEntry;

    const NAME: &'static str = "news";

    fn freshness(&self) -> Freshness {
        NEWS_FRESHNESS
    }

    async fn load(&self, symbol: &String) -> FetchResult<Option<Cached<NewsEntry>>> {
        let _file = self.file_lock.lock().await;
        let cache = json_cache::load(&self.path).await?;
        let Some(value) = cache.get(symbol) else {
            return Ok(None);
        };
        let entry: NewsEntry = serde_json::from_value(value.clone())
            .map_err(StoreError::from)?;
        let last_update = Some(entry.fetched);
        Ok(Some(Cached {
            value: entry,
            last_update,
        }))
    }

    async fn refresh(&self, symbol: &String, today: NaiveDate) -> FetchResult<()> {
        let news = self.provider.fetch_news(symbol).await?;
        let entry = NewsEntry {
            fetched: today,
            news,
        };

        let _file = self.file_lock.lock().await;
        let mut cache = json_cache::load(&self.path).await?;
        cache.insert(
            symbol.clone(),
            serde_json::to_value(&entry).map_err(StoreError::from)?,
        );
        json_cache::save(&cache, &self.path).await?;
        info!("Cached news for {}", symbol);
        Ok(())
    }
}
