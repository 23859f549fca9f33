//! Query Pipeline (C7): the orchestrator that ties the graph store,
//! activation engine, Hebbian learner, inhibition filter, ranking fuser,
//! and query cache into the single `query` / `update_from_task` /
//! `scan_project` surface the JSON-RPC layer calls (spec.md §4.7, §6.2).
//! No direct teacher analog as a single type; shaped like the teacher's
//! top-level `SelfLearningMemory` facade (`memory-core/src/memory.rs`)
//! that wires subsystems together behind one API.

use crate::activation::{self, context_relevance};
use crate::cache::{CacheKey, QueryCache};
use crate::config::MindMapConfig;
use crate::graph::GraphStore;
use crate::hebbian::{CoActivationEvent, HebbianLearner, HebbianStats};
use crate::inhibition::{FailureContext, InhibitionStats, InhibitionStore};
use crate::ranking::{self, FusionInput};
use crate::snapshot;
use crate::types::{Edge, Node, NodeId, NodeKind, QueryContext, TaskOutcomeTag, TaskRecord};
use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

fn default_true() -> bool {
    true
}

/// A single query request (spec.md §6.2, `query`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_text: String,
    #[serde(default)]
    pub type_filter: Option<NodeKind>,
    #[serde(default)]
    pub hop_cap: Option<u32>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub context: Option<QueryContext>,
    /// Skip the inhibition multiplier entirely, to inspect unsuppressed
    /// scores (spec.md §8, scenario S3).
    #[serde(default)]
    pub bypass_inhibition: bool,
    /// Skip the cache lookup and the cache write for this call (spec.md
    /// §4.7 step 2).
    #[serde(default)]
    pub bypass_cache: bool,
    /// Run spreading activation from the seed set. When `false`, results
    /// are the seeds themselves with `activation` set to their semantic
    /// score and `hop_distance` `0` (spec.md §4.7 step 4). Defaults to
    /// `true`.
    #[serde(default = "default_true")]
    pub use_activation: bool,
    /// Skip recording and draining the co-activation event for this call
    /// (spec.md §4.7 step 8).
    #[serde(default)]
    pub bypass_hebbian: bool,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            type_filter: None,
            hop_cap: None,
            limit: None,
            context: None,
            bypass_inhibition: false,
            bypass_cache: false,
            use_activation: true,
            bypass_hebbian: false,
        }
    }
}

/// The outcome of using a set of nodes in a completed task (spec.md
/// §6.2, `update_from_task`). `error_type`/`error_message`/`files_involved`
/// feed the inhibition filter's failure signature when `outcome` is
/// `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFromTaskRequest {
    pub node_ids: Vec<NodeId>,
    pub description: String,
    pub outcome: TaskOutcomeTag,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub files_involved: Vec<String>,
}

/// One ranked node in a `QueryResponse`, flattened for JSON-RPC transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedNodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub path: Option<String>,
    pub score: f64,
    pub activation: f64,
    pub semantic: f64,
    pub context: f64,
    pub freshness: f64,
    pub success_history: f64,
    pub uniqueness: f64,
}

/// Response to a `query` call. Cacheable: this is the value type stored
/// in the `QueryCache` (spec.md §4.2, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<RankedNodeView>,
    pub truncated: bool,
    #[serde(default)]
    pub from_cache: bool,
}

/// Stats for `get_stats` (spec.md §6.2).
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub average_confidence: f64,
    pub nodes_by_kind: HashMap<NodeKind, usize>,
}

/// Outcome of a bulk `scan_project` ingest (spec.md §6.2).
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub nodes_inserted: usize,
    pub nodes_merged: usize,
    pub edges_inserted: usize,
    pub edges_reinforced: usize,
    pub edges_rejected: usize,
}

/// The associative query engine: graph store, cache, activation engine,
/// Hebbian learner, inhibition filter, and ranking fuser behind one API.
pub struct MindMap {
    pub graph: GraphStore,
    cache: QueryCache<QueryResponse>,
    hebbian: HebbianLearner,
    inhibition: InhibitionStore,
    config: MindMapConfig,
}

impl MindMap {
    #[must_use]
    pub fn new(config: MindMapConfig) -> Self {
        Self {
            graph: GraphStore::new(config.graph.max_tasks_per_node, config.graph.reinforcement_eta),
            cache: QueryCache::new(config.cache),
            hebbian: HebbianLearner::new(config.hebbian),
            inhibition: InhibitionStore::new(config.inhibition),
            config,
        }
    }

    fn validate(&self, request: &QueryRequest) -> Result<usize> {
        if request.query_text.trim().is_empty() {
            return Err(Error::Validation("query_text must not be empty".into()));
        }
        if request.query_text.len() > self.config.pipeline.max_query_text_len {
            return Err(Error::Validation(format!(
                "query_text exceeds {} bytes",
                self.config.pipeline.max_query_text_len
            )));
        }
        let limit = request
            .limit
            .unwrap_or(self.config.pipeline.max_limit)
            .clamp(self.config.pipeline.min_limit, self.config.pipeline.max_limit);
        Ok(limit)
    }

    /// Run the full seed -> activation -> inhibition -> fusion -> cache
    /// pipeline for one query (spec.md §4.7).
    #[instrument(skip(self, request), fields(query_len = request.query_text.len()))]
    pub fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let limit = self.validate(&request)?;
        let deadline = Instant::now() + self.config.pipeline.deadline;

        let key = CacheKey::build(
            &request.query_text,
            request.type_filter,
            request.hop_cap,
            limit,
            request.context.as_ref(),
            request.bypass_inhibition,
            request.use_activation,
        );
        if !request.bypass_cache {
            if let Some(mut cached) = self.cache.get(&key) {
                cached.from_cache = true;
                return Ok(cached);
            }
        }

        let seeds = self
            .graph
            .find_seeds(&request.query_text, request.type_filter, self.config.activation.seed_cap);
        let seed_scores: HashMap<NodeId, f64> = seeds
            .iter()
            .map(|s| (s.node_id.clone(), (s.textual_score / 3.8).clamp(0.0, 1.0)))
            .collect();
        let seed_pairs: Vec<(NodeId, f64)> = seeds
            .iter()
            .map(|s| (s.node_id.clone(), (s.textual_score / 3.8).clamp(0.0, 1.0)))
            .collect();

        let outcome = if request.use_activation {
            let outcome = activation::spread(
                &self.graph,
                &seed_pairs,
                &self.config.activation,
                request.hop_cap,
                request.context.as_ref(),
                Some(deadline),
            );
            if outcome.truncated {
                warn!(traversals = outcome.traversals, "activation spreading truncated");
            }
            outcome
        } else {
            let results = seed_pairs
                .iter()
                .map(|(node_id, score)| activation::ActivationResult {
                    node_id: node_id.clone(),
                    activation: *score,
                    hop_distance: 0,
                })
                .collect();
            activation::ActivationOutcome { results, truncated: false, traversals: 0 }
        };

        let context_text = build_context_text(&request);
        let active_files: Vec<String> = request.context.as_ref().map(|c| c.active_files.clone()).unwrap_or_default();

        let inputs: Vec<FusionInput> = outcome
            .results
            .iter()
            .filter_map(|r| {
                let node = self.graph.get_node(&r.node_id)?;
                let context_score = request
                    .context
                    .as_ref()
                    .map(|ctx| context_relevance(&node, ctx))
                    .unwrap_or(0.0);
                Some(FusionInput {
                    node,
                    activation: r.activation,
                    semantic: seed_scores.get(&r.node_id).copied().unwrap_or(0.0),
                    context: context_score,
                    hop_distance: r.hop_distance,
                })
            })
            .collect();

        let mut ranked = ranking::fuse(
            inputs,
            &self.config.ranking,
            &self.inhibition,
            &context_text,
            &active_files,
            request.bypass_inhibition,
        );
        ranked.truncate(limit);

        if !request.bypass_hebbian && ranked.len() >= 2 {
            self.hebbian.record(CoActivationEvent {
                nodes: ranked.iter().map(|r| r.node.id.clone()).collect(),
                context_tag: request.context.as_ref().and_then(|c| c.current_task.clone()),
            });
            self.hebbian.drain_into(&self.graph);
        }

        let touched_paths: Vec<String> = ranked.iter().filter_map(|r| r.node.path.clone()).collect();
        let top_score = ranked.first().map(|r| r.score).unwrap_or(0.0);

        let response = QueryResponse {
            results: ranked
                .into_iter()
                .map(|r| RankedNodeView {
                    id: r.node.id,
                    kind: r.node.kind,
                    name: r.node.name,
                    path: r.node.path,
                    score: r.score,
                    activation: r.activation,
                    semantic: r.semantic,
                    context: r.context,
                    freshness: r.freshness,
                    success_history: r.success_history,
                    uniqueness: r.uniqueness,
                })
                .collect(),
            truncated: outcome.truncated,
            from_cache: false,
        };

        if !request.bypass_cache {
            self.cache.put(key, response.clone(), top_score, touched_paths);
        }
        Ok(response)
    }

    /// Record the outcome of using a set of results in a real task
    /// (spec.md §6.2, `update_from_task`). Feeds `success_history` on
    /// each node, strengthens their co-activation, and on failure feeds
    /// the inhibition filter with the full failure context.
    pub fn update_from_task(&self, request: UpdateFromTaskRequest) {
        let record = TaskRecord {
            description: request.description.clone(),
            outcome: request.outcome,
            recorded_at: Utc::now(),
        };
        for id in &request.node_ids {
            self.graph.record_task(id, record.clone());
            if request.outcome == TaskOutcomeTag::Error {
                let failure = FailureContext {
                    task_description: request.description.clone(),
                    error_type: request.error_type.clone(),
                    error_message: request.error_message.clone(),
                    files: request.files_involved.clone(),
                };
                self.inhibition.record_failure(id.clone(), &failure);
            }
        }
        if request.node_ids.len() >= 2 {
            self.hebbian.record(CoActivationEvent {
                nodes: request.node_ids.clone(),
                context_tag: None,
            });
            self.hebbian.drain_into(&self.graph);
        }
        let mut touched_paths: Vec<String> = request.node_ids.iter().map(|id| id.0.clone()).collect();
        touched_paths.extend(request.files_involved.iter().cloned());
        self.cache.invalidate_paths(&touched_paths);
    }

    /// Bulk-ingest nodes and edges from a project scan (spec.md §6.2,
    /// `scan_project`).
    pub fn scan_project(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> ScanReport {
        let mut report = ScanReport::default();
        let mut touched_paths = Vec::new();

        for node in nodes {
            if let Some(path) = &node.path {
                touched_paths.push(path.clone());
            }
            match self.graph.add_node(node) {
                crate::graph::AddNodeOutcome::Inserted => report.nodes_inserted += 1,
                crate::graph::AddNodeOutcome::Merged(_) => report.nodes_merged += 1,
            }
        }
        for edge in edges {
            match self.graph.add_edge(edge) {
                Ok(crate::graph::AddEdgeOutcome::Inserted) => report.edges_inserted += 1,
                Ok(crate::graph::AddEdgeOutcome::Reinforced) => report.edges_reinforced += 1,
                Err(_) => report.edges_rejected += 1,
            }
        }

        if !touched_paths.is_empty() {
            self.cache.invalidate_paths(&touched_paths);
        }
        info!(
            nodes_inserted = report.nodes_inserted,
            nodes_merged = report.nodes_merged,
            edges_inserted = report.edges_inserted,
            "scan_project ingested"
        );
        report
    }

    #[must_use]
    pub fn get_stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            average_confidence: self.graph.average_confidence(),
            nodes_by_kind: self.graph.nodes_by_kind(),
        }
    }

    #[must_use]
    pub fn get_cache_stats(&self) -> crate::cache::CacheMetrics {
        self.cache.metrics()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn get_hebbian_stats(&self) -> HebbianStats {
        self.hebbian.stats()
    }

    #[must_use]
    pub fn get_inhibitory_stats(&self) -> InhibitionStats {
        self.inhibition.stats()
    }

    /// Persist the graph and the inhibition filter's failure patterns to
    /// `base` (spec.md §2 C8, §6.3). Hebbian state needs no separate
    /// file: `co_activates`/`relates_to` edges already round-trip through
    /// the graph snapshot.
    pub fn save_snapshot(&self, base: &Path) -> Result<()> {
        snapshot::save_graph(base, self.graph.all_nodes(), self.graph.all_edges())?;
        snapshot::save_inhibition(base, self.inhibition.export_patterns())
    }

    /// Restore the graph and inhibition patterns from a snapshot at
    /// `base`, if one exists. Returns whether a graph snapshot was found.
    pub fn load_snapshot(&self, base: &Path) -> Result<bool> {
        let found = match snapshot::load_graph(base)? {
            Some(snap) => {
                self.graph.load(snap.nodes, snap.edges);
                true
            }
            None => false,
        };
        if let Some(inhibition_snap) = snapshot::load_inhibition(base)? {
            self.inhibition.import_patterns(inhibition_snap.patterns);
        }
        Ok(found)
    }

    /// Run one maintenance tick: Hebbian and inhibition decay. Intended
    /// to be called from a `tokio::time::interval` loop by the hosting
    /// binary (spec.md §5).
    pub fn maintenance_tick(&self) {
        self.hebbian.decay_tick(&self.graph);
        self.inhibition.decay_tick();
    }

    #[must_use]
    pub fn decay_tick_interval(&self) -> Duration {
        self.config.hebbian.decay_tick_interval
    }
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new(MindMapConfig::default())
    }
}

/// Drive periodic Hebbian/inhibition decay on a `tokio::time::interval`,
/// the concurrency model spec.md §5 calls for. Returns when `shutdown`
/// is set to `true`.
pub async fn run_maintenance_loop(mindmap: Arc<MindMap>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(mindmap.decay_tick_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => mindmap.maintenance_tick(),
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn build_context_text(request: &QueryRequest) -> String {
    let mut parts = vec![request.query_text.clone()];
    if let Some(ctx) = &request.context {
        if let Some(task) = &ctx.current_task {
            parts.push(task.clone());
        }
        parts.extend(ctx.recent_errors.iter().cloned());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;

    fn seeded_mindmap() -> MindMap {
        let mm = MindMap::default();
        mm.graph.add_node(Node::new("f", NodeKind::File, "MindMapEngine.ts").with_path("src/MindMapEngine.ts"));
        mm.graph.add_node(Node::new("c", NodeKind::Class, "MindMapEngine"));
        mm.graph.add_node(Node::new("m", NodeKind::Function, "query"));
        mm.graph
            .add_edge(Edge::new(NodeId::from("f"), NodeId::from("c"), EdgeKind::Contains, 0.9, 0.9))
            .unwrap();
        mm.graph
            .add_edge(Edge::new(NodeId::from("c"), NodeId::from("m"), EdgeKind::Contains, 0.9, 0.9))
            .unwrap();
        mm
    }

    #[test]
    fn query_returns_seed_and_activated_neighbors() {
        let mm = seeded_mindmap();
        let response = mm
            .query(QueryRequest {
                query_text: "MindMapEngine".into(),
                hop_cap: Some(2),
                ..Default::default()
            })
            .unwrap();
        let ids: Vec<_> = response.results.iter().map(|r| r.id.clone()).collect();
        assert!(ids.contains(&NodeId::from("c")));
        assert!(ids.contains(&NodeId::from("f")));
        assert!(ids.contains(&NodeId::from("m")));
    }

    #[test]
    fn repeated_query_is_served_from_cache() {
        let mm = seeded_mindmap();
        let request = QueryRequest {
            query_text: "MindMapEngine".into(),
            ..Default::default()
        };
        let first = mm.query(request.clone()).unwrap();
        assert!(!first.from_cache);
        let second = mm.query(request).unwrap();
        assert!(second.from_cache);
    }

    #[test]
    fn empty_query_text_is_rejected() {
        let mm = seeded_mindmap();
        let result = mm.query(QueryRequest { query_text: "   ".into(), ..Default::default() });
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn update_from_task_feeds_inhibition_on_error() {
        let mm = seeded_mindmap();
        mm.update_from_task(UpdateFromTaskRequest {
            node_ids: vec![NodeId::from("c")],
            description: "approach failed badly".into(),
            outcome: TaskOutcomeTag::Error,
            error_type: None,
            error_message: None,
            files_involved: vec![],
        });
        let factor = mm.inhibition.suppression_factor(&NodeId::from("c"), "approach failed badly", &[]);
        assert!(factor < 1.0);
    }

    #[test]
    fn update_from_task_threads_error_context_into_the_signature() {
        let mm = seeded_mindmap();
        mm.update_from_task(UpdateFromTaskRequest {
            node_ids: vec![NodeId::from("c")],
            description: "fix the query handler".into(),
            outcome: TaskOutcomeTag::Error,
            error_type: Some("TypeError".into()),
            error_message: Some("Cannot read property 'id' of undefined".into()),
            files_involved: vec!["src/MindMapEngine.ts".into()],
        });
        let factor = mm.inhibition.suppression_factor(
            &NodeId::from("c"),
            "TypeError Cannot read property id of undefined",
            &["src/MindMapEngine.ts".into()],
        );
        assert!(factor < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn maintenance_loop_ticks_until_shutdown() {
        let mm = Arc::new(MindMap::new(MindMapConfig {
            hebbian: crate::config::HebbianConfig {
                decay_tick_interval: Duration::from_millis(10),
                ..Default::default()
            },
            ..Default::default()
        }));
        mm.graph.add_node(Node::new("a", NodeKind::File, "a.rs"));
        mm.graph.add_node(Node::new("b", NodeKind::File, "b.rs"));
        let edge = Edge::new(NodeId::from("a"), NodeId::from("b"), EdgeKind::CoActivates, 0.9, 0.9);
        mm.graph.add_edge(edge).unwrap();

        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(run_maintenance_loop(mm.clone(), rx));

        tokio::time::advance(Duration::from_millis(25)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn bypass_inhibition_recovers_score_suppressed_by_prior_failure() {
        let mm = seeded_mindmap();
        mm.update_from_task(UpdateFromTaskRequest {
            node_ids: vec![NodeId::from("c")],
            description: "MindMapEngine broke here".into(),
            outcome: TaskOutcomeTag::Error,
            error_type: None,
            error_message: None,
            files_involved: vec![],
        });

        let suppressed = mm
            .query(QueryRequest {
                query_text: "MindMapEngine".into(),
                context: Some(QueryContext { current_task: Some("MindMapEngine broke here".into()), ..Default::default() }),
                ..Default::default()
            })
            .unwrap();
        let bypassed = mm
            .query(QueryRequest {
                query_text: "MindMapEngine".into(),
                context: Some(QueryContext { current_task: Some("MindMapEngine broke here".into()), ..Default::default() }),
                bypass_inhibition: true,
                ..Default::default()
            })
            .unwrap();

        let suppressed_score = suppressed.results.iter().find(|r| r.id == NodeId::from("c")).unwrap().score;
        let bypassed_score = bypassed.results.iter().find(|r| r.id == NodeId::from("c")).unwrap().score;
        assert!(bypassed_score > suppressed_score);
    }

    #[test]
    fn scan_project_reports_inserted_and_merged() {
        let mm = MindMap::default();
        let report = mm.scan_project(
            vec![Node::new("a", NodeKind::File, "a.rs")],
            vec![],
        );
        assert_eq!(report.nodes_inserted, 1);
        let report2 = mm.scan_project(vec![Node::new("a", NodeKind::File, "a.rs")], vec![]);
        assert_eq!(report2.nodes_merged, 1);
    }

    #[test]
    fn bypass_cache_never_serves_a_cached_result() {
        let mm = seeded_mindmap();
        let request = QueryRequest { query_text: "MindMapEngine".into(), bypass_cache: true, ..Default::default() };
        mm.query(request.clone()).unwrap();
        let second = mm.query(request).unwrap();
        assert!(!second.from_cache);
        assert_eq!(mm.get_cache_stats().entry_count, 0);
    }

    #[test]
    fn use_activation_false_returns_only_seeds_with_zero_hop_distance() {
        let mm = seeded_mindmap();
        let response = mm
            .query(QueryRequest {
                query_text: "query".into(),
                use_activation: false,
                ..Default::default()
            })
            .unwrap();
        let ids: Vec<_> = response.results.iter().map(|r| r.id.clone()).collect();
        assert!(ids.contains(&NodeId::from("m")));
        assert!(!ids.contains(&NodeId::from("c")));
        assert!(!ids.contains(&NodeId::from("f")));
    }

    #[test]
    fn bypass_hebbian_skips_co_activation_edge_creation() {
        let mm = seeded_mindmap();
        mm.query(QueryRequest {
            query_text: "MindMapEngine query".into(),
            hop_cap: Some(2),
            bypass_hebbian: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(mm.graph.edges_of_kind(&NodeId::from("c"), EdgeKind::CoActivates).len(), 0);
    }

    #[test]
    fn save_and_load_snapshot_round_trips_inhibition_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let mm = seeded_mindmap();
        mm.update_from_task(UpdateFromTaskRequest {
            node_ids: vec![NodeId::from("c")],
            description: "approach failed badly".into(),
            outcome: TaskOutcomeTag::Error,
            error_type: None,
            error_message: None,
            files_involved: vec![],
        });
        mm.save_snapshot(dir.path()).unwrap();

        let restored = MindMap::default();
        restored.load_snapshot(dir.path()).unwrap();
        let factor = restored.inhibition.suppression_factor(&NodeId::from("c"), "approach failed badly", &[]);
        assert!(factor < 1.0);
    }
}
