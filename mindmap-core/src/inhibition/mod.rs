//! Inhibition Filter (C5): remembers which results led to recorded
//! failures for a given node, and suppresses that node in future rankings
//! when the current context looks similar (spec.md §4.5). No direct
//! teacher analog; authored fresh, but structured like the graph store's
//! `RwLock`-guarded map (`graph::store::GraphStore`).

pub mod signature;

use crate::config::InhibitionConfig;
use crate::types::{clamp01, reinforce, NodeId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Everything that can describe why a node's use in a task failed
/// (spec.md §4.5, §6.2 `update_from_task`). `task_description` is always
/// present; the rest is whatever the caller happened to know.
#[derive(Debug, Clone, Default)]
pub struct FailureContext {
    pub task_description: String,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub files: Vec<String>,
}

impl FailureContext {
    fn text_parts(&self) -> Vec<&str> {
        let mut parts = vec![self.task_description.as_str()];
        if let Some(error_type) = &self.error_type {
            parts.push(error_type);
        }
        if let Some(error_message) = &self.error_message {
            parts.push(error_message);
        }
        parts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub signature: String,
    pub tokens: HashSet<String>,
    pub strength: f64,
    pub created_at: DateTime<Utc>,
    pub last_reinforced: DateTime<Utc>,
    pub occurrence_count: u64,
}

/// Stats surfaced via `get_inhibitory_stats` (spec.md §6.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct InhibitionStats {
    pub pattern_count: usize,
    pub patterns_created: u64,
    pub patterns_reinforced: u64,
    pub patterns_pruned: u64,
}

/// Per-node failure pattern store.
pub struct InhibitionStore {
    patterns: RwLock<HashMap<NodeId, Vec<Pattern>>>,
    stats: RwLock<InhibitionStats>,
    config: InhibitionConfig,
}

impl InhibitionStore {
    #[must_use]
    pub fn new(config: InhibitionConfig) -> Self {
        Self {
            patterns: RwLock::new(HashMap::new()),
            stats: RwLock::new(InhibitionStats::default()),
            config,
        }
    }

    /// Record that `node_id` was associated with a failure described by
    /// `failure`. Reinforces an existing near-duplicate pattern (Jaccard
    /// overlap at or above the configured threshold) instead of creating
    /// a new one, so paraphrased repeats of the same failure strengthen a
    /// single pattern (spec.md §4.5).
    pub fn record_failure(&self, node_id: NodeId, failure: &FailureContext) -> f64 {
        let (sig, tokens) = signature::signature_of(&failure.text_parts(), &failure.files);
        let now = Utc::now();
        let mut patterns = self.patterns.write();
        let entries = patterns.entry(node_id).or_default();

        if let Some(existing) = entries.iter_mut().find(|p| {
            p.signature == sig || signature::jaccard(&p.tokens, &tokens) >= self.config.jaccard_threshold
        }) {
            existing.strength = reinforce(existing.strength, self.config.reinforce_eta);
            existing.last_reinforced = now;
            existing.occurrence_count += 1;
            self.stats.write().patterns_reinforced += 1;
            return existing.strength;
        }

        let strength = self.config.new_strength;
        entries.push(Pattern {
            signature: sig,
            tokens,
            strength,
            created_at: now,
            last_reinforced: now,
            occurrence_count: 1,
        });
        self.stats.write().patterns_created += 1;
        strength
    }

    /// Multiplier in `[0, 1]` to apply to `node_id`'s ranking score given
    /// the current query context. `1.0` means no suppression. Suppression
    /// is `strength * overlap` for the strongest matching pattern, not
    /// `strength` alone, so a pattern only partially resembling the
    /// current context holds back less than a near-exact repeat (spec.md
    /// §4.5).
    #[must_use]
    pub fn suppression_factor(&self, node_id: &NodeId, context_text: &str, files: &[String]) -> f64 {
        let patterns = self.patterns.read();
        let Some(entries) = patterns.get(node_id) else {
            return 1.0;
        };
        if context_text.trim().is_empty() && files.is_empty() {
            return 1.0;
        }
        let (_, tokens) = signature::signature_of(&[context_text], files);

        let strongest_suppression = entries
            .iter()
            .map(|p| {
                let overlap = signature::jaccard(&p.tokens, &tokens);
                if overlap >= self.config.jaccard_threshold {
                    p.strength * overlap
                } else {
                    0.0
                }
            })
            .fold(0.0_f64, f64::max);

        clamp01(1.0 - strongest_suppression)
    }

    /// Age every pattern exponentially by elapsed time over the
    /// configured half-life, pruning those that decay below the prune
    /// threshold (spec.md §4.5).
    pub fn decay_tick(&self) {
        let now = Utc::now();
        let half_life_secs = self.config.half_life.as_secs_f64().max(1.0);
        let mut patterns = self.patterns.write();
        let mut pruned = 0u64;

        patterns.retain(|_, entries| {
            entries.retain_mut(|pattern| {
                let elapsed_secs = (now - pattern.last_reinforced).num_seconds().max(0) as f64;
                pattern.strength = clamp01(pattern.strength * 0.5_f64.powf(elapsed_secs / half_life_secs));
                let keep = pattern.strength >= self.config.prune_threshold;
                if !keep {
                    pruned += 1;
                }
                keep
            });
            !entries.is_empty()
        });

        if pruned > 0 {
            self.stats.write().patterns_pruned += pruned;
        }
    }

    #[must_use]
    pub fn stats(&self) -> InhibitionStats {
        let mut stats = *self.stats.read();
        stats.pattern_count = self.patterns.read().values().map(Vec::len).sum();
        stats
    }

    /// Snapshot every pattern for persistence (spec.md §6.3,
    /// `inhibition.json`).
    #[must_use]
    pub fn export_patterns(&self) -> HashMap<NodeId, Vec<Pattern>> {
        self.patterns.read().clone()
    }

    /// Replace all patterns, used when restoring from a snapshot.
    pub fn import_patterns(&self, patterns: HashMap<NodeId, Vec<Pattern>>) {
        *self.patterns.write() = patterns;
    }
}
