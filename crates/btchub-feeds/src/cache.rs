//! Time-bounded caching for upstream data.
//!
//! [`Cache`] is the storage seam; [`MemoryCache`] is the process-local
//! implementation. [`TtlCache`] adds freshness and single-flight refresh on
//! top of any store: concurrent misses for one key wait on the same fetch.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub stored_at: Instant,
}

impl<V> Cached<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

pub trait Cache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<Cached<V>>;

    /// Store an entry as-is, keeping its original timestamp.
    fn insert_entry(&self, key: K, entry: Cached<V>);

    fn insert(&self, key: K, value: V) {
        self.insert_entry(key, Cached::new(value));
    }

    fn invalidate(&self, key: &K);

    fn clear(&self);
}

pub struct MemoryCache<K, V> {
    entries: RwLock<HashMap<K, Cached<V>>>,
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Cached<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn insert_entry(&self, key: K, entry: Cached<V>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, entry);
    }

    fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }
}

pub struct TtlCache<K, V> {
    name: &'static str,
    store: Arc<dyn Cache<K, V>>,
    ttl: Duration,
    inflight: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_store(name, ttl, Arc::new(MemoryCache::default()))
    }

    pub fn with_store(name: &'static str, ttl: Duration, store: Arc<dyn Cache<K, V>>) -> Self {
        Self {
            name,
            store,
            ttl,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Value for `key` if it is younger than the TTL.
    pub fn fresh(&self, key: &K) -> Option<V> {
        self.store
            .get(key)
            .filter(|c| c.is_fresh(self.ttl))
            .map(|c| c.value)
    }

    /// Value for `key` regardless of age.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.store.get(key).map(|c| c.value)
    }

    pub fn insert(&self, key: K, value: V) {
        self.store.insert(key, value);
    }

    /// Edit a stored value in place without renewing its freshness.
    pub fn modify(&self, key: &K, f: impl FnOnce(&mut V)) {
        if let Some(mut entry) = self.store.get(key) {
            f(&mut entry.value);
            self.store.insert_entry(key.clone(), entry);
        }
    }

    pub fn invalidate(&self, key: &K) {
        self.store.invalidate(key);
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Return the fresh value for `key`, or run `fetch` to replace it.
    ///
    /// Only one `fetch` per key runs at a time; callers that queued behind it
    /// see its result through the freshness re-check. When `fetch` fails the
    /// stale entry is served if there is one, otherwise the error is returned.
    pub async fn get_or_refresh<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        if let Some(value) = self.fresh(&key) {
            debug!(cache = self.name, "cache hit");
            return Ok(value);
        }

        let gate = self.gate(&key);
        let result = {
            let _guard = gate.lock().await;

            if let Some(value) = self.fresh(&key) {
                debug!(cache = self.name, "refreshed by concurrent caller");
                Ok(value)
            } else {
                match fetch().await {
                    Ok(value) => {
                        self.store.insert(key.clone(), value.clone());
                        Ok(value)
                    }
                    Err(e) => match self.store.get(&key) {
                        Some(stale) => {
                            warn!(cache = self.name, error = %e, "refresh failed, serving stale entry");
                            Ok(stale.value)
                        }
                        None => Err(e),
                    },
                }
            }
        };

        self.release(&key, gate);
        result
    }

    fn gate(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.entry(key.clone()).or_default().clone()
    }

    fn release(&self, key: &K, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus ours: nobody else is waiting.
        if Arc::strong_count(&gate) <= 2 {
            inflight.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_skips_fetch() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_refresh("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_refetched() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("k", 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.fresh(&"k"), None);

        let v = cache
            .get_or_refresh("k", || async { Ok::<_, String>(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_serves_stale() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("k", 1);
        tokio::time::advance(Duration::from_secs(120)).await;

        let v = cache
            .get_or_refresh("k", || async { Err::<i32, _>("down".to_string()) })
            .await
            .unwrap();
        assert_eq!(v, 1);
    }

    #[tokio::test]
    async fn failed_refresh_without_entry_errors() {
        let cache: TtlCache<&str, i32> = TtlCache::new("test", Duration::from_secs(60));
        let err = cache
            .get_or_refresh("k", || async { Err::<i32, _>("down".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "down");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_fetch() {
        let cache = Arc::new(TtlCache::new("test", Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_refresh("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(42)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn modify_keeps_timestamp() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("k", vec![1, 2, 3]);
        tokio::time::advance(Duration::from_secs(50)).await;

        cache.modify(&"k", |v| v.retain(|n| *n != 2));
        assert_eq!(cache.fresh(&"k"), Some(vec![1, 3]));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.fresh(&"k"), None);
    }
}
