//! Query Cache (C2): a sharded, TTL- and byte-bounded cache keyed by the
//! normalized query shape, with score-based eviction and path-prefix
//! invalidation (spec.md §4.2). Grounded in the teacher's sharded LRU
//! cache (`memory-core/src/retrieval/cache/lru.rs`), generalized from a
//! pure LRU to importance-weighted eviction since spec.md ties eviction to
//! result relevance rather than recency alone.

pub mod types;

pub use types::{CacheEntry, CacheKey, CacheMetrics};

use crate::config::CacheConfig;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::seq::IteratorRandom;
use std::collections::HashMap;

/// Candidates considered per eviction once a shard grows past this size;
/// below it every entry is scanned, so small caches evict deterministically.
const EVICTION_SAMPLE_SIZE: usize = 16;

/// Estimate the serialized size of a value for byte-cap accounting.
/// Approximate by design: spec.md only requires a soft byte ceiling, not
/// exact accounting.
fn estimate_bytes<V: serde::Serialize>(value: &V) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(256)
}

struct Shard<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
}

impl<V> Default for Shard<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

/// Sharded, bounded query result cache.
pub struct QueryCache<V> {
    shards: Vec<RwLock<Shard<V>>>,
    path_index: RwLock<HashMap<String, std::collections::HashSet<CacheKey>>>,
    metrics: Mutex<CacheMetrics>,
    config: CacheConfig,
}

impl<V: Clone + serde::Serialize> QueryCache<V> {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let shard_count = config.shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(Shard::default())).collect(),
            path_index: RwLock::new(HashMap::new()),
            metrics: Mutex::new(CacheMetrics::default()),
            config,
        }
    }

    fn shard_for(&self, key: &CacheKey) -> &RwLock<Shard<V>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        use std::hash::{Hash, Hasher};
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Look up a cached value; transparently expires and evicts entries
    /// past the TTL (spec.md §4.2).
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let shard = self.shard_for(key);
        let mut shard = shard.write();
        let now = Utc::now();

        if let Some(entry) = shard.entries.get(key) {
            let age = now - entry.inserted_at;
            if age.to_std().unwrap_or_default() > self.config.ttl {
                shard.entries.remove(key);
                self.metrics.lock().misses += 1;
                return None;
            }
        }

        match shard.entries.get_mut(key) {
            Some(entry) => {
                entry.hit_count += 1;
                entry.last_accessed = now;
                self.metrics.lock().hits += 1;
                Some(entry.value.clone())
            }
            None => {
                self.metrics.lock().misses += 1;
                None
            }
        }
    }

    /// Insert a value, evicting lower-scored entries if the shard's
    /// overall byte budget would be exceeded (spec.md §4.2 eviction:
    /// importance x time-decay).
    pub fn put(&self, key: CacheKey, value: V, importance: f64, touched_paths: Vec<String>) {
        let byte_size = estimate_bytes(&value);
        let now = Utc::now();
        let entry = CacheEntry {
            value,
            importance: importance.clamp(0.0, 1.0),
            inserted_at: now,
            last_accessed: now,
            hit_count: 0,
            byte_size,
            touched_paths: touched_paths.clone(),
        };

        let per_shard_cap = self.config.byte_cap / self.shards.len().max(1);
        let shard_lock = self.shard_for(&key);
        {
            let mut shard = shard_lock.write();
            shard.entries.insert(key.clone(), entry);

            let mut total: usize = shard.entries.values().map(|e| e.byte_size).sum();
            let half_life = self.config.time_decay_half_life_minutes;
            while total > per_shard_cap && shard.entries.len() > 1 {
                // Sample a handful of candidates rather than scanning the whole
                // shard, the approximate-LFU trick real caches use to keep
                // eviction O(1)-ish instead of O(n) per insert.
                let sample_size = EVICTION_SAMPLE_SIZE.min(shard.entries.len());
                let mut rng = rand::rng();
                let evict_key = shard
                    .entries
                    .keys()
                    .choose_multiple(&mut rng, sample_size)
                    .into_iter()
                    .min_by(|a, b| {
                        let score_a = shard.entries[*a].eviction_score(now, half_life);
                        let score_b = shard.entries[*b].eviction_score(now, half_life);
                        score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .cloned();
                if let Some(evict_key) = evict_key {
                    if let Some(evicted) = shard.entries.remove(&evict_key) {
                        total -= evicted.byte_size;
                        self.metrics.lock().evictions += 1;
                    }
                } else {
                    break;
                }
            }
        }

        if !touched_paths.is_empty() {
            let mut index = self.path_index.write();
            for path in touched_paths {
                index.entry(path).or_default().insert(key.clone());
            }
        }
    }

    /// Drop every cached entry whose result touched a node under any of
    /// `paths` (prefix match), used when the graph store changes under a
    /// file (spec.md §4.2).
    pub fn invalidate_paths(&self, paths: &[String]) {
        let mut index = self.path_index.write();
        let mut to_remove: std::collections::HashSet<CacheKey> = std::collections::HashSet::new();

        index.retain(|indexed_path, keys| {
            let matches = paths.iter().any(|p| indexed_path.starts_with(p.as_str()));
            if matches {
                to_remove.extend(keys.iter().cloned());
                false
            } else {
                true
            }
        });
        drop(index);

        if to_remove.is_empty() {
            return;
        }
        for shard in &self.shards {
            let mut shard = shard.write();
            shard.entries.retain(|k, _| !to_remove.contains(k));
        }
        self.metrics.lock().invalidations += to_remove.len() as u64;
    }

    /// Drop every cached entry, used by `clear_cache` (spec.md §6.2).
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().entries.clear();
        }
        self.path_index.write().clear();
    }

    /// Snapshot current metrics, filling in live size/entry-count.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        let mut metrics = *self.metrics.lock();
        metrics.entry_count = self.shards.iter().map(|s| s.read().entries.len()).sum();
        metrics.size_bytes = self
            .shards
            .iter()
            .map(|s| s.read().entries.values().map(|e| e.byte_size).sum::<usize>())
            .sum();
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::time::Duration;

    fn cache() -> QueryCache<String> {
        QueryCache::new(CacheConfig {
            ttl: Duration::from_secs(600),
            byte_cap: 1024,
            shard_count: 1,
            time_decay_half_life_minutes: 60.0,
        })
    }

    #[test]
    fn put_then_get_is_a_hit() {
        let cache = cache();
        let key = CacheKey::build("auth", None, Some(3), 10, None, false, true);
        cache.put(key.clone(), "result".to_string(), 0.8, vec!["src/auth.rs".into()]);
        assert_eq!(cache.get(&key), Some("result".to_string()));
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn miss_increments_counter() {
        let cache = cache();
        let key = CacheKey::build("nothing", None, None, 10, None, false, true);
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn invalidate_paths_removes_matching_entries_only() {
        let cache = cache();
        let key_a = CacheKey::build("auth", None, None, 10, None, false, true);
        let key_b = CacheKey::build("billing", None, None, 10, None, false, true);
        cache.put(key_a.clone(), "a".to_string(), 0.5, vec!["src/auth/login.rs".into()]);
        cache.put(key_b.clone(), "b".to_string(), 0.5, vec!["src/billing/invoice.rs".into()]);

        cache.invalidate_paths(&["src/auth".to_string()]);

        assert_eq!(cache.get(&key_a), None);
        assert_eq!(cache.get(&key_b), Some("b".to_string()));
    }

    #[test]
    fn eviction_prefers_lower_importance_entries() {
        let cache = cache();
        for i in 0..50 {
            let key = CacheKey::build(&format!("q{i}"), None, None, 10, None, false, true);
            cache.put(key, "x".repeat(100), if i == 0 { 0.01 } else { 0.9 }, vec![]);
        }
        let first_key = CacheKey::build("q0", None, None, 10, None, false, true);
        assert_eq!(cache.get(&first_key), None);
    }

    #[test]
    fn clear_empties_all_shards() {
        let cache = cache();
        let key = CacheKey::build("auth", None, None, 10, None, false, true);
        cache.put(key.clone(), "x".to_string(), 0.5, vec![]);
        cache.clear();
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.metrics().entry_count, 0);
    }
}
