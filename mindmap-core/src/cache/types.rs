//! Cache key derivation and per-entry bookkeeping (spec.md §4.2).

use crate::types::{NodeKind, QueryContext};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// A stable, content-addressed cache key: a SHA-256 digest over the
/// normalized query parameters, so two requests that mean the same thing
/// always hash identically regardless of incidental formatting (spec.md
/// §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(pub String);

impl CacheKey {
    /// Build a key from the normalized query shape. Context fields are
    /// sorted before hashing so field order never changes the digest.
    #[must_use]
    pub fn build(
        query_text: &str,
        type_filter: Option<NodeKind>,
        hop_cap: Option<u32>,
        limit: usize,
        context: Option<&QueryContext>,
        bypass_inhibition: bool,
        use_activation: bool,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(query_text.trim().to_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(format!("{type_filter:?}").as_bytes());
        hasher.update([0u8]);
        hasher.update(hop_cap.unwrap_or(0).to_le_bytes());
        hasher.update(limit.to_le_bytes());
        hasher.update([u8::from(bypass_inhibition)]);
        hasher.update([u8::from(use_activation)]);

        if let Some(ctx) = context {
            if let Some(task) = &ctx.current_task {
                hasher.update(task.trim().to_lowercase().as_bytes());
            }
            let mut files = ctx.active_files.clone();
            files.sort();
            for f in files {
                hasher.update(f.to_lowercase().as_bytes());
            }
            let mut frameworks = ctx.frameworks.clone();
            frameworks.sort();
            for f in frameworks {
                hasher.update(f.to_lowercase().as_bytes());
            }
            let mut languages = ctx.languages.clone();
            languages.sort();
            for l in languages {
                hasher.update(l.to_lowercase().as_bytes());
            }
        }

        Self(format!("{:x}", hasher.finalize()))
    }
}

/// Aggregate cache hit/miss/eviction counters, exposed via
/// `get_cache_stats` (spec.md §6.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub entry_count: usize,
    pub size_bytes: usize,
}

impl CacheMetrics {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A cached value plus the bookkeeping needed for TTL expiry and
/// score-based eviction.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Caller-supplied importance in `[0, 1]`, typically the top result's
    /// fused score, used alongside recency for eviction ordering.
    pub importance: f64,
    pub inserted_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub hit_count: u64,
    pub byte_size: usize,
    /// Node paths this entry's result set touched, for prefix
    /// invalidation when the graph changes under a path (spec.md §4.2).
    pub touched_paths: Vec<String>,
}

impl<V> CacheEntry<V> {
    /// Eviction score: importance decayed by age, halving every
    /// `half_life_minutes`. Lower score is evicted first.
    #[must_use]
    pub fn eviction_score(&self, now: DateTime<Utc>, half_life_minutes: f64) -> f64 {
        let age_minutes = (now - self.inserted_at).num_seconds().max(0) as f64 / 60.0;
        let decay = 0.5_f64.powf(age_minutes / half_life_minutes.max(1e-6));
        self.importance * decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_queries_hash_identically_regardless_of_context_field_order() {
        let mut ctx_a = QueryContext::default();
        ctx_a.active_files = vec!["b.rs".into(), "a.rs".into()];
        let mut ctx_b = QueryContext::default();
        ctx_b.active_files = vec!["a.rs".into(), "b.rs".into()];

        let key_a = CacheKey::build("Auth", None, Some(3), 10, Some(&ctx_a), false, true);
        let key_b = CacheKey::build("auth", None, Some(3), 10, Some(&ctx_b), false, true);
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn different_limits_hash_differently() {
        let key_a = CacheKey::build("auth", None, Some(3), 10, None, false, true);
        let key_b = CacheKey::build("auth", None, Some(3), 20, None, false, true);
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn different_use_activation_hashes_differently() {
        let key_a = CacheKey::build("auth", None, Some(3), 10, None, false, true);
        let key_b = CacheKey::build("auth", None, Some(3), 10, None, false, false);
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn eviction_score_decays_with_age() {
        let now = Utc::now();
        let entry = CacheEntry {
            value: (),
            importance: 1.0,
            inserted_at: now - chrono::Duration::minutes(60),
            last_accessed: now,
            hit_count: 0,
            byte_size: 0,
            touched_paths: vec![],
        };
        let score = entry.eviction_score(now, 60.0);
        assert!((score - 0.5).abs() < 1e-6);
    }
}
