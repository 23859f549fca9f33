//! Ranking Fuser (C6): combines six independent signals into one score
//! per candidate node, applies the inhibition multiplier, and produces a
//! deterministically ordered result list (spec.md §4.6). No direct
//! teacher analog; grounded in the shape of the teacher's own multi-term
//! scorer (`memory-core/src/search/ranking.rs`) — named weighted terms
//! summed into one score, same instinct applied to a different signal
//! set.

use crate::config::RankingConfig;
use crate::inhibition::InhibitionStore;
use crate::types::{Node, NodeId};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One candidate's raw signal inputs before fusion.
#[derive(Debug, Clone)]
pub struct FusionInput {
    pub node: Node,
    /// Spreading-activation level for this node, `[0, 1]`.
    pub activation: f64,
    /// Textual/seed match strength for this node, `[0, 1]`.
    pub semantic: f64,
    /// Context-overlap score for this node, `[0, 1]` (spec.md §4.7).
    pub context: f64,
    /// Hops from the nearest seed, used only for the tie-break (spec.md
    /// §4.6).
    pub hop_distance: u32,
}

/// A fully scored, ready-to-sort result.
#[derive(Debug, Clone)]
pub struct RankedNode {
    pub node: Node,
    pub score: f64,
    pub activation: f64,
    pub semantic: f64,
    pub context: f64,
    pub freshness: f64,
    pub success_history: f64,
    pub uniqueness: f64,
    pub inhibition_factor: f64,
    pub hop_distance: u32,
}

fn freshness_score(node: &Node, half_life_days: f64) -> f64 {
    let age_days = (Utc::now() - node.last_updated).num_seconds().max(0) as f64 / 86_400.0;
    0.5_f64.powf(age_days / half_life_days.max(1e-6))
}

fn success_history_score(node: &Node, normalizer: f64) -> f64 {
    (node.metadata.successful_task_count() as f64 / normalizer.max(1e-6)).min(1.0)
}

/// Penalize candidates that share a name with other candidates in the
/// same batch, so near-duplicate results do not crowd out distinct ones.
fn uniqueness_scores(inputs: &[FusionInput]) -> HashMap<NodeId, f64> {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *name_counts.entry(input.node.name.to_lowercase()).or_insert(0) += 1;
    }
    inputs
        .iter()
        .map(|input| {
            let count = name_counts[&input.node.name.to_lowercase()] as f64;
            (input.node.id.clone(), 1.0 / count)
        })
        .collect()
}

/// Fuse all candidates into ranked results, sorted by descending score
/// with a deterministic tie-break: nearer hops first, then higher
/// confidence (spec.md §4.6, invariant on stable ordering).
#[must_use]
pub fn fuse(
    inputs: Vec<FusionInput>,
    config: &RankingConfig,
    inhibition: &InhibitionStore,
    context_text: &str,
    active_files: &[String],
    bypass_inhibition: bool,
) -> Vec<RankedNode> {
    let uniqueness = uniqueness_scores(&inputs);

    let mut ranked: Vec<RankedNode> = inputs
        .into_iter()
        .map(|input| {
            let freshness = freshness_score(&input.node, config.freshness_half_life_days);
            let success_history = success_history_score(&input.node, config.success_history_normalizer);
            let uniq = uniqueness[&input.node.id];
            let inhibition_factor = if bypass_inhibition {
                1.0
            } else {
                inhibition.suppression_factor(&input.node.id, context_text, active_files)
            };

            let raw = config.weight_activation * input.activation
                + config.weight_semantic * input.semantic
                + config.weight_context * input.context
                + config.weight_freshness * freshness
                + config.weight_success_history * success_history
                + config.weight_uniqueness * uniq;

            RankedNode {
                node: input.node,
                score: (raw * inhibition_factor).clamp(0.0, 1.0),
                activation: input.activation,
                semantic: input.semantic,
                context: input.context,
                freshness,
                success_history,
                uniqueness: uniq,
                inhibition_factor,
                hop_distance: input.hop_distance,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.hop_distance.cmp(&b.hop_distance))
            .then_with(|| b.node.confidence.partial_cmp(&a.node.confidence).unwrap_or(Ordering::Equal))
    });
    ranked
}
