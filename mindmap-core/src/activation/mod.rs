//! Activation Engine (C3): level-synchronous spreading activation from a
//! seed set, with per-hop decay, a cycle guard, a traversal cap, and
//! deadline-aware truncation (spec.md §4.3). No direct analog in the
//! teacher; authored fresh in the teacher's idiom (explicit hop budgets,
//! `tracing` on truncation, same lock discipline as `graph::store`).

use crate::graph::index::tokenize;
use crate::graph::GraphStore;
use crate::types::{Direction, NodeId, NodeKind, QueryContext};
use crate::config::ActivationConfig;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// A node's final activation level after spreading.
#[derive(Debug, Clone)]
pub struct ActivationResult {
    pub node_id: NodeId,
    pub activation: f64,
    pub hop_distance: u32,
}

/// Outcome of a spreading pass, including whether it was cut short.
#[derive(Debug, Clone)]
pub struct ActivationOutcome {
    pub results: Vec<ActivationResult>,
    pub truncated: bool,
    pub traversals: usize,
}

/// Per-match cap on the task-overlap and error-overlap terms of
/// `context_relevance`: spec.md §4.3 says "per match" without naming a
/// ceiling, so a runaway number of shared tokens doesn't let one term
/// dominate the additive score (documented as an implementation choice).
const MAX_OVERLAP_MATCHES: usize = 2;

fn overlap_count(a: &HashSet<String>, b: &HashSet<String>) -> usize {
    a.intersection(b).count()
}

/// How well a node matches the caller's current context, as an additive
/// score clamped to `[0, 1]` (spec.md §4.3): task-description token
/// overlap, active-file path proximity, error-message overlap for
/// `kind=error` nodes, framework/language match, update recency, and the
/// node's own confidence. Used both to lightly boost activation
/// spreading toward context-relevant neighborhoods and as the ranking
/// fuser's `context` signal.
#[must_use]
pub fn context_relevance(node: &crate::types::Node, context: &QueryContext) -> f64 {
    let mut score = 0.0;

    if let Some(task) = &context.current_task {
        let task_tokens: HashSet<String> = tokenize(task).into_iter().collect();
        let matches: usize = node
            .metadata
            .tasks
            .iter()
            .map(|t| overlap_count(&task_tokens, &tokenize(&t.description).into_iter().collect()))
            .sum();
        score += 0.3 * matches.min(MAX_OVERLAP_MATCHES) as f64;
    }

    if !context.active_files.is_empty() {
        if let Some(path) = &node.path {
            if context.active_files.iter().any(|f| path.contains(f.as_str()) || f.contains(path.as_str())) {
                score += 0.4;
            }
        }
    }

    if node.kind == NodeKind::Error && !context.recent_errors.is_empty() {
        let node_text = node.metadata.message.as_deref().unwrap_or(node.name.as_str());
        let node_tokens: HashSet<String> = tokenize(node_text).into_iter().collect();
        let matches: usize = context
            .recent_errors
            .iter()
            .map(|e| overlap_count(&tokenize(e).into_iter().collect(), &node_tokens))
            .sum();
        score += 0.25 * matches.min(MAX_OVERLAP_MATCHES) as f64;
    }

    if !context.frameworks.is_empty() && context.frameworks.iter().any(|f| node.frameworks.contains(f)) {
        score += 0.2;
    }

    if !context.languages.is_empty() && context.languages.iter().any(|l| node.languages.contains(l)) {
        score += 0.15;
    }

    let hours_since_update = (chrono::Utc::now() - node.last_updated).num_seconds().max(0) as f64 / 3600.0;
    score += 0.1 * (-hours_since_update / 24.0).exp();

    score += 0.1 * node.confidence;

    score.min(1.0)
}

/// Spread activation outward from `seeds` across the graph.
///
/// Each node is expanded at most once (the `visited` set is the cycle
/// guard), so the pass always terminates even on a cyclic graph. A node
/// reached by multiple paths keeps the maximum activation seen, not the
/// sum, so fan-in does not runaway-amplify (spec.md §4.3, invariant on
/// bounded activation).
pub fn spread(
    graph: &GraphStore,
    seeds: &[(NodeId, f64)],
    config: &ActivationConfig,
    requested_hop_cap: Option<u32>,
    context: Option<&QueryContext>,
    deadline: Option<Instant>,
) -> ActivationOutcome {
    let hop_cap = config.clamped_hop_cap(requested_hop_cap);
    let max_traversals = config.max_traversals_multiplier * seeds.len().max(1);

    let mut activations: HashMap<NodeId, (f64, u32)> = HashMap::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut frontier: Vec<NodeId> = Vec::new();

    let mut seeds_sorted = seeds.to_vec();
    seeds_sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    seeds_sorted.truncate(config.seed_cap);

    for (id, score) in &seeds_sorted {
        let strength = (config.seed_strength * score).min(1.0);
        activations.insert(id.clone(), (strength, 0));
        if visited.insert(id.clone()) {
            frontier.push(id.clone());
        }
    }

    let mut traversals = 0usize;
    let mut truncated = false;

    'hops: for hop in 1..=hop_cap {
        if frontier.is_empty() {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                debug!(hop, "activation spreading hit deadline, truncating");
                truncated = true;
                break 'hops;
            }
        }

        let mut next_frontier = Vec::new();
        for node_id in &frontier {
            let (current_activation, _) = *activations.get(node_id).unwrap_or(&(0.0, hop - 1));
            if current_activation < config.threshold {
                continue;
            }

            for edge in graph.neighbors(node_id, Direction::Both) {
                let Some(kind_weight) = edge.kind.propagation_weight() else {
                    continue;
                };
                if traversals >= max_traversals {
                    truncated = true;
                    break 'hops;
                }
                traversals += 1;

                let neighbor = if &edge.source == node_id { edge.target } else { edge.source };
                let mut new_activation = current_activation * config.base_decay * edge.weight * kind_weight;

                if let (Some(ctx), Some(node)) = (context, graph.get_node(&neighbor)) {
                    let relevance = context_relevance(&node, ctx);
                    new_activation *= 1.0 + 0.2 * relevance;
                }
                new_activation = new_activation.min(1.0);

                if new_activation < config.threshold {
                    continue;
                }

                let entry = activations.entry(neighbor.clone()).or_insert((0.0, hop));
                if new_activation > entry.0 {
                    *entry = (new_activation, hop);
                }

                if visited.insert(neighbor.clone()) {
                    next_frontier.push(neighbor);
                }
            }
        }
        frontier = next_frontier;
    }

    let results = activations
        .into_iter()
        .map(|(node_id, (activation, hop_distance))| ActivationResult {
            node_id,
            activation,
            hop_distance,
        })
        .collect();

    ActivationOutcome {
        results,
        truncated,
        traversals,
    }
}
