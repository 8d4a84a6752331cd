//! Keyed TTL cache of upstream queries.
//!
//! A lookup either returns a value fetched less than `ttl` ago, joins a
//! fetch already running for the same key, or starts a new fetch. Failed
//! fetches are dropped from the cache so the next lookup retries.
//!
//! Map guards are never held across an `.await`: the entry is inspected and
//! updated synchronously, and the fetch itself is driven through a
//! [`Shared`] future every concurrent caller polls.

use std::{fmt::Debug, future::Future, hash::Hash, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ClientError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, ClientError>>>;

#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// Time a fetched value is served without refetching.
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

enum Slot<V> {
    Ready { value: V, fetched_at: Instant },
    InFlight(SharedFetch<V>),
}

#[derive(derive_more::Debug)]
pub struct QueryCache<K: Eq + Hash, V> {
    name: &'static str,
    config: CacheConfig,
    #[debug("{} entries", entries.len())]
    entries: DashMap<K, Slot<V>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Clone + Debug + Eq + Hash,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        Self {
            name,
            config,
            entries: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Returns the cached value for `key` or the result of `fetch`.
    ///
    /// `fetch` is only called when neither a fresh value nor an in-flight
    /// fetch exists for `key`.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ClientError>> + Send + 'static,
    {
        let shared = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let joined = match occupied.get() {
                    Slot::Ready { value, fetched_at } if fetched_at.elapsed() < self.config.ttl => {
                        debug!(cache = self.name, ?key, "cache hit");
                        return Ok(value.clone());
                    }
                    Slot::InFlight(shared) => Some(shared.clone()),
                    Slot::Ready { .. } => None,
                };
                match joined {
                    Some(shared) => {
                        debug!(cache = self.name, ?key, "joining in-flight fetch");
                        shared
                    }
                    None => {
                        debug!(cache = self.name, ?key, "cache entry expired");
                        let shared = fetch().boxed().shared();
                        occupied.insert(Slot::InFlight(shared.clone()));
                        shared
                    }
                }
            }
            Entry::Vacant(vacant) => {
                debug!(cache = self.name, ?key, "cache miss");
                let shared = fetch().boxed().shared();
                vacant.insert(Slot::InFlight(shared.clone()));
                shared
            }
        };

        let result = shared.clone().await;
        self.settle(&key, &shared, &result);
        result
    }

    /// Fresh cached value of `key`, without fetching.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.get(key).and_then(|slot| match &*slot {
            Slot::Ready { value, fetched_at } if fetched_at.elapsed() < self.config.ttl => {
                Some(value.clone())
            }
            _ => None,
        })
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the in-flight slot with its outcome, unless the slot was
    /// invalidated or replaced meanwhile.
    fn settle(&self, key: &K, fetch: &SharedFetch<V>, result: &Result<V, ClientError>) {
        if let Entry::Occupied(mut occupied) = self.entries.entry(key.clone()) {
            let current = matches!(occupied.get(), Slot::InFlight(shared) if shared.ptr_eq(fetch));
            if !current {
                return;
            }
            match result {
                Ok(value) => {
                    occupied.insert(Slot::Ready {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                    });
                }
                Err(err) => {
                    debug!(cache = self.name, ?key, %err, "fetch failed, not caching");
                    occupied.remove();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u64,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u64, ClientError>> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_is_served_from_cache() {
        let cache = QueryCache::new("test", CacheConfig::new(TTL));
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_fetch("a", counting_fetch(&calls, 1)).await.unwrap(), 1);
        assert_eq!(cache.get_or_fetch("a", counting_fetch(&calls, 2)).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&"a"), Some(1));

        tokio::time::advance(TTL).await;
        assert_eq!(cache.peek(&"a"), None);
        assert_eq!(cache.get_or_fetch("a", counting_fetch(&calls, 3)).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache = QueryCache::new("test", CacheConfig::new(TTL));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("a", counting_fetch(&calls, 7)),
            cache.get_or_fetch("a", counting_fetch(&calls, 8)),
            cache.get_or_fetch("b", counting_fetch(&calls, 9)),
        );
        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(c.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_not_cached() {
        let cache: QueryCache<&str, u64> = QueryCache::new("test", CacheConfig::new(TTL));
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = {
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ClientError::Transport("connection reset".to_string())) }
            }
        };
        assert!(cache.get_or_fetch("a", failing).await.is_err());
        assert!(cache.is_empty());

        assert_eq!(cache.get_or_fetch("a", counting_fetch(&calls, 5)).await.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let cache = QueryCache::new("test", CacheConfig::new(TTL));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch("a", counting_fetch(&calls, 1)).await.unwrap();
        cache.invalidate(&"a");
        assert_eq!(cache.get_or_fetch("a", counting_fetch(&calls, 2)).await.unwrap(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
