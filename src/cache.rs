//! Explicit read-through cache for slow-moving reference data.
//!
//! The dashboard repeatedly needs small lookup sets (the office catalogue,
//! mostly) that change once per election cycle. Those live here, keyed and
//! owned by the caller, rather than in ambient process-wide state.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

/// Read-through cache with a fixed TTL and explicit invalidation.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, running `loader` on a miss or an
    /// expired entry. Loader errors are returned as-is and nothing is cached
    /// for the key in that case.
    pub async fn get_or_load<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get_fresh(&key) {
            return Ok(value);
        }

        let value = loader().await?;
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            Entry {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Fresh cached value for `key`, if any. The lock is never held across
    /// an await point.
    fn get_fresh(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().unwrap().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
