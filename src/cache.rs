use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entries kept before least-recently-used eviction starts.
const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
struct CacheEntry {
    data: String,
    expires_at: Instant,
    last_accessed: Instant,
}

/// Serialized-response cache shared through `AppState`.
///
/// Holds JSON so any `Serialize` payload can be stored; reads deserialize a
/// fresh copy. Writes to properties call [`ResponseCache::clear`].
///
/// Handlers that compute a value from the store read [`generation`] first
/// and store the result with [`set_if_unchanged`], so a value computed
/// before a concurrent `clear` is never kept.
///
/// [`generation`]: ResponseCache::generation
/// [`set_if_unchanged`]: ResponseCache::set_if_unchanged
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    generation: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ResponseCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            capacity: capacity.max(1),
        }
    }

    /// Get cached data if it exists and hasn't expired
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entry = self.entries.get_mut(key)?;

        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(key);
            return None;
        }

        entry.last_accessed = Instant::now();
        serde_json::from_str(&entry.data).ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<(), serde_json::Error> {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(key) {
            self.evict_lru_entries();
        }

        let data = serde_json::to_string(data)?;
        let now = Instant::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                expires_at: now + ttl,
                last_accessed: now,
            },
        );
        Ok(())
    }

    /// Bumped by every [`ResponseCache::clear`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `data` only if no `clear` happened since `generation` was
    /// read. Returns whether the entry was kept.
    pub fn set_if_unchanged<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, serde_json::Error> {
        if self.generation() != generation {
            return Ok(false);
        }
        self.set(key, data, ttl)?;

        // A clear that started between the check and the insert.
        if self.generation() != generation {
            self.entries.remove(key);
            return Ok(false);
        }
        Ok(true)
    }

    /// Removes a fifth of the entries (at least one), oldest access first.
    fn evict_lru_entries(&self) {
        let current_size = self.entries.len();
        let target_remove = (current_size / 5).max(1);

        let mut entries: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_accessed))
            .collect();
        entries.sort_by_key(|(_, last_accessed)| *last_accessed);

        for (key, _) in entries.iter().take(target_remove) {
            self.entries.remove(key);
        }

        tracing::debug!(
            "🗑️  Cache eviction: removed {} LRU entries (cache size: {} -> {})",
            target_remove,
            current_size,
            self.entries.len()
        );
    }

    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let before_count = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before_count.saturating_sub(self.entries.len());

        if removed > 0 {
            tracing::debug!("🧹 Cleaned up {} expired cache entries", removed);
        }
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
