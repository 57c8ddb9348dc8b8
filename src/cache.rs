use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A bounded in-memory cache with a time-to-live per entry
///
/// When a new key is inserted into a full cache, the least recently written
/// entry is evicted first.
#[derive(Debug)]
pub struct Cache<T> {
    store: Arc<RwLock<HashMap<String, (T, Instant)>>>,
    ttl: Duration,
    capacity: usize,
}

impl<T: Clone + Send + Sync + 'static> Cache<T> {
    /// Creates a new in-memory cache with the specified TTL and entry limit
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Retrieves a value from the cache by its key
    pub async fn get(&self, key: &str) -> Option<T> {
        let store = self.store.read().await;
        store
            .get(key)
            .filter(|(_, time)| time.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    /// Updates the entry for `key` in place, starting from `init` when it is
    /// missing or expired, and returns the stored value
    pub async fn upsert<F>(&self, key: &str, init: T, update: F) -> T
    where
        F: FnOnce(&mut T),
    {
        let mut store = self.store.write().await;
        let expired = store
            .get(key)
            .map_or(true, |(_, time)| time.elapsed() >= self.ttl);
        if expired {
            store.remove(key);
            self.make_room(&mut store, key);
        }
        let entry = store
            .entry(key.to_string())
            .or_insert_with(|| (init, Instant::now()));
        update(&mut entry.0);
        entry.1 = Instant::now();
        entry.0.clone()
    }

    /// Removes expired entries from the cache and returns the count of removed entries
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write().await;
        let before_len = store.len();
        store.retain(|_, (_, time)| time.elapsed() < self.ttl);
        before_len - store.len()
    }

    fn make_room(&self, store: &mut HashMap<String, (T, Instant)>, key: &str) {
        if store.contains_key(key) {
            return;
        }
        store.retain(|_, (_, time)| time.elapsed() < self.ttl);
        while store.len() >= self.capacity {
            let oldest = store
                .iter()
                .min_by_key(|(_, (_, time))| *time)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    store.remove(&k);
                }
                None => break,
            }
        }
    }
}
