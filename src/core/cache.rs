use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type LockMap<K> = Arc<StdMutex<HashMap<K, Arc<Mutex<()>>>>>;

/// One async lock per cache key.
///
/// Callers populating the same key queue behind each other, so only the
/// first one reaches the upstream and the rest find the row already written.
/// A key's entry lives only while someone holds or waits for it.
#[derive(Clone)]
pub struct KeyLocks<K> {
    inner: LockMap<K>,
}

/// Held while a key is being populated. Dropping it releases the key and
/// forgets the entry when nobody else is waiting.
pub struct KeyGuard<K: Eq + Hash> {
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap<K>,
}

impl<K> KeyLocks<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub async fn acquire(&self, key: &K) -> KeyGuard<K> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                locks
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        if lock.try_lock().is_err() {
            debug!("Waiting for in-flight fetch of {:?}", key);
        }
        KeyGuard {
            key: key.clone(),
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.inner),
        }
    }

    /// Keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for KeyLocks<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        // New acquirers clone the entry under this same map lock
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyLocks::<String>::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&"AAPL".to_string()).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::<String>::new();
        let aapl = locks.acquire(&"AAPL".to_string()).await;
        // Would deadlock if keys shared a lock
        let msft = locks.acquire(&"MSFT".to_string()).await;
        assert_eq!(locks.len(), 2);

        drop(aapl);
        assert_eq!(locks.len(), 1);
        drop(msft);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_waiter_queued() {
        let locks = KeyLocks::<String>::new();
        let first = locks.acquire(&"IBM".to_string()).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&"IBM".to_string()).await;
            })
        };
        // Let the waiter clone the entry and block on it
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
