//! Centralized tuning constants.
//!
//! Defaults mirror the ranges spec.md calls out; exact values are an
//! implementation choice within those ranges (spec.md §9, Open Questions).

/// Default configuration values for every tunable component.
pub mod defaults {
    use std::time::Duration;

    // Graph store (C1)
    pub const REINFORCEMENT_ETA: f64 = 0.1;
    pub const MAX_TASKS_PER_NODE: usize = 50;

    // Query cache (C2)
    pub const CACHE_TTL: Duration = Duration::from_secs(600);
    pub const CACHE_BYTE_CAP: usize = 64 * 1024 * 1024;
    pub const CACHE_SHARD_COUNT: usize = 16;
    pub const CACHE_TIME_DECAY_HALF_LIFE_MINUTES: f64 = 60.0;

    // Activation engine (C3)
    pub const HOP_CAP_DEFAULT: u32 = 3;
    pub const HOP_CAP_MAX: u32 = 10;
    pub const BASE_DECAY: f64 = 0.7;
    pub const ACTIVATION_THRESHOLD: f64 = 0.1;
    pub const SEED_STRENGTH: f64 = 1.0;
    pub const SEED_CAP: usize = 16;
    pub const MAX_TRAVERSALS_MULTIPLIER: usize = 4;

    // Hebbian learner (C4)
    pub const HEBBIAN_ETA: f64 = 0.1;
    pub const HEBBIAN_CONFIDENCE_ETA: f64 = 0.05;
    pub const HEBBIAN_NEW_EDGE_WEIGHT: f64 = 0.2;
    pub const HEBBIAN_NEW_EDGE_CONFIDENCE: f64 = 0.3;
    pub const HEBBIAN_CO_NODES_CAP: usize = 12;
    pub const HEBBIAN_EVENT_WEIGHT: f64 = 0.8;
    pub const HEBBIAN_DECAY_TICK_INTERVAL: Duration = Duration::from_secs(60);
    pub const HEBBIAN_DECAY_RATE: f64 = 0.95;
    pub const HEBBIAN_DECAY_WINDOW: Duration = Duration::from_secs(15 * 60);
    pub const HEBBIAN_PRUNE_THRESHOLD: f64 = 0.05;
    pub const HEBBIAN_QUEUE_CAPACITY: usize = 4096;
    pub const HEBBIAN_BURST_SIZE: usize = 64;
    pub const TRANSITIVE_DISCOVERY_THRESHOLD: f64 = 0.7;

    // Inhibition filter (C5)
    pub const INHIBITION_NEW_STRENGTH: f64 = 0.5;
    pub const INHIBITION_REINFORCE_ETA: f64 = 0.1;
    pub const INHIBITION_HALF_LIFE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    pub const INHIBITION_PRUNE_THRESHOLD: f64 = 0.05;
    pub const INHIBITION_JACCARD_THRESHOLD: f64 = 0.5;

    // Ranking fuser (C6)
    pub const WEIGHT_ACTIVATION: f64 = 0.45;
    pub const WEIGHT_SEMANTIC: f64 = 0.15;
    pub const WEIGHT_CONTEXT: f64 = 0.2;
    pub const WEIGHT_FRESHNESS: f64 = 0.1;
    pub const WEIGHT_SUCCESS_HISTORY: f64 = 0.05;
    pub const WEIGHT_UNIQUENESS: f64 = 0.05;
    pub const FRESHNESS_HALF_LIFE_DAYS: f64 = 30.0;
    pub const SUCCESS_HISTORY_NORMALIZER: f64 = 10.0;

    // Query pipeline (C7)
    pub const MAX_QUERY_TEXT_LEN: usize = 1_000;
    pub const MIN_LIMIT: usize = 1;
    pub const MAX_LIMIT: usize = 200;
    pub const QUERY_DEADLINE: Duration = Duration::from_secs(15);

    // Snapshot I/O (C8)
    pub const SNAPSHOT_DIR_NAME: &str = ".mindmap-cache";
    pub const SNAPSHOT_FILE_NAME: &str = "mindmap.json";
    pub const INHIBITION_FILE_NAME: &str = "inhibition.json";
    pub const LOG_FILE_NAME: &str = "mcp.log";
}

/// Edge-kind propagation weights used by the activation engine (spec.md
/// §4.3). `inhibits` edges are deliberately excluded from spreading.
pub mod edge_weights {
    pub const CONTAINS: f64 = 0.9;
    pub const CALLS: f64 = 0.8;
    pub const IMPORTS: f64 = 0.7;
    pub const FIXES: f64 = 0.9;
    pub const DEPENDS_ON: f64 = 0.7;
    pub const CO_ACTIVATES: f64 = 0.8;
    pub const RELATES_TO: f64 = 0.6;
}
