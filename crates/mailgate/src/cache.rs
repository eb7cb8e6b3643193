//! In-memory expiring cache for pending submission tokens.
//!
//! Every entry shares one fixed lifetime set at construction. Expired
//! entries are dropped lazily on `get`, and eagerly by a background sweep
//! once `start` has been called, so memory stays bounded without read
//! traffic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::time::Instant;

struct Entry<V, M> {
    value: V,
    meta: M,
    expires_at: Instant,
}

impl<V, M> Entry<V, M> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Key to (value, metadata) map with a single TTL and a background sweep
pub struct ExpiringCache<V, M> {
    /// All reads and writes go through this lock
    entries: RwLock<HashMap<String, Entry<V, M>>>,
    /// Lifetime applied to every entry, also the sweep interval
    lifetime: Duration,
    /// Stop signal for the running sweep, taken on first `stop`
    sweep_stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl<V, M> ExpiringCache<V, M>
where
    V: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            lifetime,
            sweep_stop: Mutex::new(None),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Insert or overwrite `key`; expiration is now + lifetime
    pub async fn set(&self, key: impl Into<String>, value: V, meta: M) {
        let entry = Entry {
            value,
            meta,
            expires_at: Instant::now() + self.lifetime,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Look up `key`. Expired entries are removed and reported as absent.
    pub async fn get(&self, key: &str) -> Option<(V, M)> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Some((entry.value.clone(), entry.meta.clone()));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check under the write lock; a concurrent `set` may have refreshed it
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(key);
        }
        None
    }

    /// Remove `key` and return it if it had not yet expired.
    ///
    /// Lookup and removal happen under one write lock, so of several
    /// concurrent callers for the same key at most one receives the entry.
    pub async fn take(&self, key: &str) -> Option<(V, M)> {
        let entry = self.entries.write().await.remove(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some((entry.value, entry.meta))
    }

    /// Delete `key`. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Number of stored entries, including expired ones not yet swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Launch the background sweep. Calling it while a sweep runs is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut stop = self.sweep_stop.lock().await;
        if stop.is_some() {
            tracing::warn!("Cache sweep already running");
            return;
        }

        let (tx, rx) = oneshot::channel();
        *stop = Some(tx);
        tokio::spawn(sweep_worker(Arc::clone(self), rx));
    }

    /// Stop the background sweep. Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        if let Some(tx) = self.sweep_stop.lock().await.take() {
            // The worker may already be gone; nothing to do then
            let _ = tx.send(());
        }
    }
}

/// Periodically purge expired entries until stopped
async fn sweep_worker<V, M>(cache: Arc<ExpiringCache<V, M>>, mut stop: oneshot::Receiver<()>)
where
    V: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    tracing::info!(
        interval_secs = cache.lifetime.as_secs(),
        "🧹 Cache sweep started"
    );

    loop {
        tokio::select! {
            _ = tokio::time::sleep(cache.lifetime) => {
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Swept expired cache entries");
                }
            }
            _ = &mut stop => {
                tracing::info!("🧹 Cache sweep shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(lifetime_secs: u64) -> Arc<ExpiringCache<String, u32>> {
        Arc::new(ExpiringCache::new(Duration::from_secs(lifetime_secs)))
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = cache(60);
        cache.set("k", "v".to_string(), 7).await;

        assert_eq!(cache.get("k").await, Some(("v".to_string(), 7)));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = cache(60);
        cache.set("k", "first".to_string(), 1).await;
        cache.set("k", "second".to_string(), 2).await;

        assert_eq!(cache.get("k").await, Some(("second".to_string(), 2)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_expires_lazily() {
        let cache = cache(1);
        cache.set("k", "v".to_string(), 0).await;

        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_purges_without_get() {
        let cache = cache(1);
        cache.start().await;
        cache.set("k", "v".to_string(), 0).await;

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(cache.len().await, 0);
        cache.stop().await;
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let cache = cache(60);
        cache.set("k", "v".to_string(), 0).await;

        cache.remove("k").await;
        cache.remove("k").await;
        cache.remove("never-set").await;

        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_take_yields_entry_once() {
        let cache = cache(60);
        cache.set("k", "v".to_string(), 3).await;

        assert_eq!(cache.take("k").await, Some(("v".to_string(), 3)));
        assert_eq!(cache.take("k").await, None);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_ignores_expired_entry() {
        let cache = cache(1);
        cache.set("k", "v".to_string(), 0).await;

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.take("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_take_has_single_winner() {
        let cache = cache(60);
        cache.set("k", "v".to_string(), 0).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.take("k").await.is_some() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let cache = cache(60);
        cache.stop().await;
        cache.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let cache = cache(60);
        cache.start().await;
        cache.start().await;
        cache.stop().await;
        cache.stop().await;

        // A stopped cache can be started again
        cache.start().await;
        cache.stop().await;
    }
}
