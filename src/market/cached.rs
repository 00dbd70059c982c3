//! The load, check, fetch, write-back cycle shared by every cached domain.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::cache::KeyLocks;
use crate::core::clock::Clock;
use crate::core::error::FetchResult;
use crate::core::freshness::Freshness;

/// A value read back from the cache, with the day it was last written when
/// the domain records one.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub last_update: Option<NaiveDate>,
}

impl<V> Cached<V> {
    pub fn permanent(value: V) -> Self {
        Cached {
            value,
            last_update: None,
        }
    }
}

/// One cached data domain: how to read it, when it goes stale and how to
/// refill it from upstream.
#[async_trait]
pub trait CachedEntity: Send + Sync {
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;
    type Value: Send;

    const NAME: &'static str;

    fn freshness(&self) -> Freshness;

    async fn load(&self, key: &Self::Key) -> FetchResult<Option<Cached<Self::Value>>>;

    /// Fetches `key` upstream and writes it to the cache.
    async fn refresh(&self, key: &Self::Key, today: NaiveDate) -> FetchResult<()>;
}

pub struct CachedFetch<E: CachedEntity> {
    entity: E,
    clock: Arc<dyn Clock>,
    locks: KeyLocks<E::Key>,
}

impl<E: CachedEntity> CachedFetch<E> {
    pub fn new(entity: E, clock: Arc<dyn Clock>) -> Self {
        CachedFetch {
            entity,
            clock,
            locks: KeyLocks::new(),
        }
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    fn is_fresh(&self, cached: &Cached<E::Value>) -> bool {
        !self
            .entity
            .freshness()
            .is_stale(cached.last_update, self.clock.today())
    }

    /// Returns the cached value for `key`, refreshing it first when absent or
    /// stale. Soft upstream failures are logged and whatever was cached is
    /// returned instead.
    pub async fn get(&self, key: &E::Key) -> FetchResult<Option<E::Value>> {
        if let Some(cached) = self.entity.load(key).await?
            && self.is_fresh(&cached)
        {
            debug!("{} cache hit for {:?}", E::NAME, key);
            return Ok(Some(cached.value));
        }

        let _guard = self.locks.acquire(key).await;
        // Another caller may have refreshed while we waited
        let cached = self.entity.load(key).await?;
        if let Some(current) = &cached
            && self.is_fresh(current)
        {
            debug!("{} refreshed by concurrent request for {:?}", E::NAME, key);
            return Ok(cached.map(|c| c.value));
        }

        debug!("{} cache miss for {:?}", E::NAME, key);
        match self.entity.refresh(key, self.clock.today()).await {
            Ok(()) => Ok(self.entity.load(key).await?.map(|c| c.value)),
            Err(e) if e.is_soft() => {
                warn!("{} refresh for {:?} skipped: {}", E::NAME, key, e);
                Ok(cached.map(|c| c.value))
            }
            Err(e) => Err(e),
        }
    }
}
