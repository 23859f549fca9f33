//! Crate-wide configuration: every tunable named in spec.md collected into
//! one struct so a host process can override defaults from environment or
//! file, mirroring the teacher's `constants::defaults` module
//! (`memory-core/src/constants.rs`) but as a single overridable struct
//! rather than free constants, since the spec calls numeric defaults
//! recalibratable (spec.md §1, Non-goals).

use crate::constants::defaults;
use std::time::Duration;

/// Tunables for the graph store (C1).
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    pub reinforcement_eta: f64,
    pub max_tasks_per_node: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            reinforcement_eta: defaults::REINFORCEMENT_ETA,
            max_tasks_per_node: defaults::MAX_TASKS_PER_NODE,
        }
    }
}

/// Tunables for the query cache (C2).
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub byte_cap: usize,
    pub shard_count: usize,
    pub time_decay_half_life_minutes: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: defaults::CACHE_TTL,
            byte_cap: defaults::CACHE_BYTE_CAP,
            shard_count: defaults::CACHE_SHARD_COUNT,
            time_decay_half_life_minutes: defaults::CACHE_TIME_DECAY_HALF_LIFE_MINUTES,
        }
    }
}

/// Tunables for the activation engine (C3).
#[derive(Debug, Clone, Copy)]
pub struct ActivationConfig {
    pub hop_cap: u32,
    pub base_decay: f64,
    pub threshold: f64,
    pub seed_strength: f64,
    pub seed_cap: usize,
    pub max_traversals_multiplier: usize,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            hop_cap: defaults::HOP_CAP_DEFAULT,
            base_decay: defaults::BASE_DECAY,
            threshold: defaults::ACTIVATION_THRESHOLD,
            seed_strength: defaults::SEED_STRENGTH,
            seed_cap: defaults::SEED_CAP,
            max_traversals_multiplier: defaults::MAX_TRAVERSALS_MULTIPLIER,
        }
    }
}

impl ActivationConfig {
    /// Clamp a caller-supplied hop cap into the allowed range (spec.md
    /// §4.3: default 3, max 10).
    #[must_use]
    pub fn clamped_hop_cap(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.hop_cap).min(defaults::HOP_CAP_MAX)
    }
}

/// Tunables for the Hebbian learner (C4).
#[derive(Debug, Clone, Copy)]
pub struct HebbianConfig {
    pub eta: f64,
    pub confidence_eta: f64,
    pub new_edge_weight: f64,
    pub new_edge_confidence: f64,
    pub co_nodes_cap: usize,
    pub event_weight: f64,
    pub decay_tick_interval: Duration,
    pub decay_rate: f64,
    pub decay_window: Duration,
    pub prune_threshold: f64,
    pub queue_capacity: usize,
    pub burst_size: usize,
    pub transitive_discovery_threshold: f64,
}

impl Default for HebbianConfig {
    fn default() -> Self {
        Self {
            eta: defaults::HEBBIAN_ETA,
            confidence_eta: defaults::HEBBIAN_CONFIDENCE_ETA,
            new_edge_weight: defaults::HEBBIAN_NEW_EDGE_WEIGHT,
            new_edge_confidence: defaults::HEBBIAN_NEW_EDGE_CONFIDENCE,
            co_nodes_cap: defaults::HEBBIAN_CO_NODES_CAP,
            event_weight: defaults::HEBBIAN_EVENT_WEIGHT,
            decay_tick_interval: defaults::HEBBIAN_DECAY_TICK_INTERVAL,
            decay_rate: defaults::HEBBIAN_DECAY_RATE,
            decay_window: defaults::HEBBIAN_DECAY_WINDOW,
            prune_threshold: defaults::HEBBIAN_PRUNE_THRESHOLD,
            queue_capacity: defaults::HEBBIAN_QUEUE_CAPACITY,
            burst_size: defaults::HEBBIAN_BURST_SIZE,
            transitive_discovery_threshold: defaults::TRANSITIVE_DISCOVERY_THRESHOLD,
        }
    }
}

/// Tunables for the inhibition filter (C5).
#[derive(Debug, Clone, Copy)]
pub struct InhibitionConfig {
    pub new_strength: f64,
    pub reinforce_eta: f64,
    pub half_life: Duration,
    pub prune_threshold: f64,
    pub jaccard_threshold: f64,
}

impl Default for InhibitionConfig {
    fn default() -> Self {
        Self {
            new_strength: defaults::INHIBITION_NEW_STRENGTH,
            reinforce_eta: defaults::INHIBITION_REINFORCE_ETA,
            half_life: defaults::INHIBITION_HALF_LIFE,
            prune_threshold: defaults::INHIBITION_PRUNE_THRESHOLD,
            jaccard_threshold: defaults::INHIBITION_JACCARD_THRESHOLD,
        }
    }
}

/// Tunables for the ranking fuser (C6).
#[derive(Debug, Clone, Copy)]
pub struct RankingConfig {
    pub weight_activation: f64,
    pub weight_semantic: f64,
    pub weight_context: f64,
    pub weight_freshness: f64,
    pub weight_success_history: f64,
    pub weight_uniqueness: f64,
    pub freshness_half_life_days: f64,
    pub success_history_normalizer: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weight_activation: defaults::WEIGHT_ACTIVATION,
            weight_semantic: defaults::WEIGHT_SEMANTIC,
            weight_context: defaults::WEIGHT_CONTEXT,
            weight_freshness: defaults::WEIGHT_FRESHNESS,
            weight_success_history: defaults::WEIGHT_SUCCESS_HISTORY,
            weight_uniqueness: defaults::WEIGHT_UNIQUENESS,
            freshness_half_life_days: defaults::FRESHNESS_HALF_LIFE_DAYS,
            success_history_normalizer: defaults::SUCCESS_HISTORY_NORMALIZER,
        }
    }
}

/// Tunables for the query pipeline (C7).
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub max_query_text_len: usize,
    pub min_limit: usize,
    pub max_limit: usize,
    pub deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_query_text_len: defaults::MAX_QUERY_TEXT_LEN,
            min_limit: defaults::MIN_LIMIT,
            max_limit: defaults::MAX_LIMIT,
            deadline: defaults::QUERY_DEADLINE,
        }
    }
}

/// Aggregate configuration for the whole associative query engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MindMapConfig {
    pub graph: GraphConfig,
    pub cache: CacheConfig,
    pub activation: ActivationConfig,
    pub hebbian: HebbianConfig,
    pub inhibition: InhibitionConfig,
    pub ranking: RankingConfig,
    pub pipeline: PipelineConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_internally_consistent() {
        let cfg = MindMapConfig::default();
        assert!(cfg.activation.hop_cap <= 10);
        assert!(cfg.pipeline.min_limit <= cfg.pipeline.max_limit);
    }
}
