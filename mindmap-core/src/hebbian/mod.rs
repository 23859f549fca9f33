//! Hebbian Learner (C4): nodes that activate together are wired together.
//! Co-activation events are queued (bounded, drop-oldest on overflow) and
//! drained in bursts into `co_activates` edges on the graph, with a
//! periodic decay tick that ages and prunes edges nobody has reinforced
//! recently (spec.md §4.4). No direct teacher analog; authored fresh in
//! the idiom of `memory-core/src/pattern.rs` (confidence-weighted
//! reinforcement, bounded collections, a `tracing` span per batch).

use crate::config::HebbianConfig;
use crate::graph::GraphStore;
use crate::types::{Edge, EdgeKind, NodeId};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A set of nodes observed activating together within one query.
#[derive(Debug, Clone)]
pub struct CoActivationEvent {
    pub nodes: Vec<NodeId>,
    pub context_tag: Option<String>,
}

/// Stats surfaced via `get_hebbian_stats` (spec.md §6.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct HebbianStats {
    pub queued_events: usize,
    pub dropped_events: u64,
    pub edges_reinforced: u64,
    pub edges_created: u64,
    pub edges_pruned: u64,
    pub transitive_edges_created: u64,
}

/// Bounded event queue plus the strengthening and decay logic.
pub struct HebbianLearner {
    queue: Mutex<VecDeque<CoActivationEvent>>,
    stats: Mutex<HebbianStats>,
    config: HebbianConfig,
}

impl HebbianLearner {
    #[must_use]
    pub fn new(config: HebbianConfig) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(config.queue_capacity)),
            stats: Mutex::new(HebbianStats::default()),
            config,
        }
    }

    /// Queue a co-activation event. Drops the oldest queued event when
    /// full rather than rejecting the new one, since recent co-activity
    /// is more informative than stale co-activity (spec.md §4.4).
    pub fn record(&self, event: CoActivationEvent) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.config.queue_capacity {
            queue.pop_front();
            self.stats.lock().dropped_events += 1;
            warn!(capacity = self.config.queue_capacity, "hebbian queue full, dropped oldest event");
        }
        queue.push_back(event);
    }

    /// Drain up to `burst_size` queued events, turning each co-activated
    /// node set into pairwise `co_activates` edges. Events with more than
    /// `co_nodes_cap` nodes are truncated to the first `co_nodes_cap`, to
    /// keep the pairwise fan-out bounded (spec.md §4.4).
    pub fn drain_into(&self, graph: &GraphStore) -> usize {
        let mut processed = 0;
        for _ in 0..self.config.burst_size {
            let event = {
                let mut queue = self.queue.lock();
                queue.pop_front()
            };
            let Some(event) = event else { break };

            let mut nodes = event.nodes;
            nodes.truncate(self.config.co_nodes_cap);
            nodes.dedup();

            for i in 0..nodes.len() {
                for j in (i + 1)..nodes.len() {
                    self.strengthen_pair(graph, &nodes[i], &nodes[j], event.context_tag.clone());
                }
            }
            for node in &nodes {
                self.discover_transitive(graph, node);
            }
            processed += 1;
        }
        debug!(processed, "drained hebbian events");
        processed
    }

    fn strengthen_pair(&self, graph: &GraphStore, a: &NodeId, b: &NodeId, context_tag: Option<String>) {
        if !graph.node_exists(a) || !graph.node_exists(b) {
            return;
        }
        let mut edge = Edge::new(
            a.clone(),
            b.clone(),
            EdgeKind::CoActivates,
            self.config.new_edge_weight,
            self.config.new_edge_confidence,
        );
        edge.context_tag = context_tag;

        match graph.add_edge(edge) {
            Ok(crate::graph::AddEdgeOutcome::Inserted) => self.stats.lock().edges_created += 1,
            Ok(crate::graph::AddEdgeOutcome::Reinforced) => self.stats.lock().edges_reinforced += 1,
            Err(_) => {}
        }
    }

    /// Age and prune `co_activates` edges nobody has reinforced within
    /// `decay_window`, called from a periodic background tick (spec.md
    /// §4.4).
    pub fn decay_tick(&self, graph: &GraphStore) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.decay_window).unwrap_or(chrono::Duration::zero());
        let pruned = graph.apply_edge_decay(
            EdgeKind::CoActivates,
            cutoff,
            self.config.decay_rate,
            self.config.prune_threshold,
        );
        if pruned > 0 {
            self.stats.lock().edges_pruned += pruned as u64;
            debug!(pruned, "hebbian decay tick pruned weak co_activates edges");
        }
    }

    /// Transitive discovery: if `node--b` and `node--c` are both strong
    /// `co_activates` edges, infer `b --relates_to--> c` weighted at half
    /// the weaker of the two strong edges, since nodes that both strongly
    /// co-activate with a third are likely related even without having
    /// co-activated directly themselves (spec.md §4.4).
    pub fn discover_transitive(&self, graph: &GraphStore, node: &NodeId) {
        let strong_edges: Vec<crate::types::Edge> = graph
            .edges_of_kind(node, EdgeKind::CoActivates)
            .into_iter()
            .filter(|e| e.weight >= self.config.transitive_discovery_threshold)
            .take(self.config.co_nodes_cap)
            .collect();

        for i in 0..strong_edges.len() {
            for j in (i + 1)..strong_edges.len() {
                let other = |e: &crate::types::Edge| -> NodeId {
                    if &e.source == node { e.target.clone() } else { e.source.clone() }
                };
                let (b, c) = (other(&strong_edges[i]), other(&strong_edges[j]));
                if b == c {
                    continue;
                }
                let weight = 0.5 * strong_edges[i].weight.min(strong_edges[j].weight);
                let edge = Edge::new(b, c, EdgeKind::RelatesTo, weight, self.config.new_edge_confidence);
                if matches!(graph.add_edge(edge), Ok(crate::graph::AddEdgeOutcome::Inserted)) {
                    self.stats.lock().transitive_edges_created += 1;
                }
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> HebbianStats {
        let mut stats = *self.stats.lock();
        stats.queued_events = self.queue.lock().len();
        stats
    }
}
