//! The in-memory graph store, protected by a single `RwLock` so readers
//! (`find_seeds`, `neighbors`) never block each other and writers
//! (`add_node`, `add_edge`, `remove_node`, reinforcement) see a consistent
//! snapshot (spec.md §5). Grounded in the teacher's `RelationshipGraph`
//! (`memory-core/src/memory/relationship_query.rs`) — the same
//! nodes-map/edges-list shape and `add_node`/`add_edge` pair, generalized
//! from one fixed episode type to the closed `NodeKind`/`EdgeKind` sets
//! and indexed for lookup instead of one-shot visualization. `Direction`
//! mirrors the teacher's `episode::relationships::Direction` (renamed
//! `Outgoing`/`Incoming` to `Out`/`In`).

use crate::graph::index::tokenize;
use crate::types::{clamp01, Direction, Edge, EdgeKind, Node, NodeId, NodeKind, TaskRecord};
use crate::{Error, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Result of `add_node`: whether the node was freshly inserted or merged
/// into an existing node with the same id (spec.md §4.1).
#[derive(Debug, Clone)]
pub enum AddNodeOutcome {
    Inserted,
    Merged(Node),
}

/// Result of `add_edge`: whether the edge was freshly inserted or an
/// existing `(source, target, kind)` edge was reinforced in place
/// (invariant P2 / spec.md §4.1).
#[derive(Debug, Clone)]
pub enum AddEdgeOutcome {
    Inserted,
    Reinforced,
}

/// A seed candidate produced by `find_seeds`.
#[derive(Debug, Clone)]
pub struct SeedMatch {
    pub node_id: NodeId,
    pub textual_score: f64,
}

#[derive(Default)]
struct GraphInner {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<(NodeId, NodeId, EdgeKind), Edge>,
    by_kind: HashMap<NodeKind, HashSet<NodeId>>,
    token_index: HashMap<String, HashSet<NodeId>>,
    adjacency_out: HashMap<NodeId, Vec<(NodeId, EdgeKind)>>,
    adjacency_in: HashMap<NodeId, Vec<(NodeId, EdgeKind)>>,
}

impl GraphInner {
    fn index_node_tokens(&mut self, node: &Node) {
        let mut tokens = tokenize(&node.name);
        if let Some(path) = &node.path {
            tokens.extend(tokenize(path));
        }
        for token in tokens {
            self.token_index.entry(token).or_default().insert(node.id.clone());
        }
    }

    fn deindex_node_tokens(&mut self, node: &Node) {
        let mut tokens = tokenize(&node.name);
        if let Some(path) = &node.path {
            tokens.extend(tokenize(path));
        }
        for token in tokens {
            if let Some(set) = self.token_index.get_mut(&token) {
                set.remove(&node.id);
                if set.is_empty() {
                    self.token_index.remove(&token);
                }
            }
        }
    }
}

/// Thread-safe graph store (C1).
pub struct GraphStore {
    inner: RwLock<GraphInner>,
    max_tasks_per_node: usize,
    reinforcement_eta: f64,
}

impl GraphStore {
    #[must_use]
    pub fn new(max_tasks_per_node: usize, reinforcement_eta: f64) -> Self {
        Self {
            inner: RwLock::new(GraphInner::default()),
            max_tasks_per_node,
            reinforcement_eta,
        }
    }

    /// Insert a node, or merge it into an existing node with the same id:
    /// keep `max(confidence)`, union `languages`/`frameworks`, take the
    /// latest `last_updated`, and append task metadata bounded to the
    /// configured cap (spec.md §4.1).
    pub fn add_node(&self, mut node: Node) -> AddNodeOutcome {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.nodes.get(&node.id).cloned() {
            inner.deindex_node_tokens(&existing);

            node.confidence = existing.confidence.max(node.confidence);
            node.languages.extend(existing.languages.iter().cloned());
            node.frameworks.extend(existing.frameworks.iter().cloned());
            node.last_updated = existing.last_updated.max(node.last_updated);

            let mut merged_tasks = existing.metadata.tasks.clone();
            merged_tasks.extend(node.metadata.tasks.clone());
            node.metadata.tasks = merged_tasks;
            if node.metadata.tasks.len() > self.max_tasks_per_node {
                let overflow = node.metadata.tasks.len() - self.max_tasks_per_node;
                node.metadata.tasks.drain(0..overflow);
            }
            if node.metadata.message.is_none() {
                node.metadata.message = existing.metadata.message.clone();
            }
            if node.metadata.line_number.is_none() {
                node.metadata.line_number = existing.metadata.line_number;
            }
            if node.metadata.language.is_none() {
                node.metadata.language = existing.metadata.language.clone();
            }
            for (k, v) in existing.metadata.extra.clone() {
                node.metadata.extra.entry(k).or_insert(v);
            }

            inner
                .by_kind
                .entry(existing.kind)
                .or_default()
                .remove(&existing.id);
            inner.by_kind.entry(node.kind).or_default().insert(node.id.clone());
            inner.index_node_tokens(&node);
            inner.nodes.insert(node.id.clone(), node.clone());
            AddNodeOutcome::Merged(node)
        } else {
            inner.by_kind.entry(node.kind).or_default().insert(node.id.clone());
            inner.index_node_tokens(&node);
            inner.nodes.insert(node.id.clone(), node);
            AddNodeOutcome::Inserted
        }
    }

    /// Insert or reinforce an edge. Rejects edges whose endpoints are not
    /// currently in the store (invariant P1).
    pub fn add_edge(&self, mut edge: Edge) -> Result<AddEdgeOutcome> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&edge.source) {
            return Err(Error::InvalidReference(edge.source.0.clone()));
        }
        if !inner.nodes.contains_key(&edge.target) {
            return Err(Error::InvalidReference(edge.target.0.clone()));
        }

        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        if let Some(existing) = inner.edges.get_mut(&key) {
            existing.reinforce(self.reinforcement_eta);
            return Ok(AddEdgeOutcome::Reinforced);
        }

        edge.weight = clamp01(edge.weight);
        edge.confidence = clamp01(edge.confidence);
        inner
            .adjacency_out
            .entry(edge.source.clone())
            .or_default()
            .push((edge.target.clone(), edge.kind));
        inner
            .adjacency_in
            .entry(edge.target.clone())
            .or_default()
            .push((edge.source.clone(), edge.kind));
        inner.edges.insert(key, edge);
        Ok(AddEdgeOutcome::Inserted)
    }

    /// Remove a node and cascade-remove all incident edges (spec.md §4.1).
    /// Returns the removed node (its `path`, if any, is what a cache layer
    /// should pass to `invalidate_paths`).
    pub fn remove_node(&self, id: &NodeId) -> Option<Node> {
        let mut inner = self.inner.write();
        let node = inner.nodes.remove(id)?;
        inner.deindex_node_tokens(&node);
        inner.by_kind.entry(node.kind).or_default().remove(id);

        let out_targets = inner.adjacency_out.remove(id).unwrap_or_default();
        for (target, kind) in &out_targets {
            inner.edges.remove(&(id.clone(), target.clone(), *kind));
            if let Some(in_list) = inner.adjacency_in.get_mut(target) {
                in_list.retain(|(src, k)| !(src == id && k == kind));
            }
        }

        let in_sources = inner.adjacency_in.remove(id).unwrap_or_default();
        for (source, kind) in &in_sources {
            inner.edges.remove(&(source.clone(), id.clone(), *kind));
            if let Some(out_list) = inner.adjacency_out.get_mut(source) {
                out_list.retain(|(tgt, k)| !(tgt == id && k == kind));
            }
        }

        Some(node)
    }

    /// Look up a node by id without mutating anything.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Whether a node currently exists in the store.
    #[must_use]
    pub fn node_exists(&self, id: &NodeId) -> bool {
        self.inner.read().nodes.contains_key(id)
    }

    /// Iterate over edges incident to `id` in the requested direction.
    /// Required to be bidirectional for activation spreading (spec.md
    /// §4.1).
    #[must_use]
    pub fn neighbors(&self, id: &NodeId, direction: Direction) -> Vec<Edge> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(targets) = inner.adjacency_out.get(id) {
                for (target, kind) in targets {
                    if let Some(edge) = inner.edges.get(&(id.clone(), target.clone(), *kind)) {
                        out.push(edge.clone());
                    }
                }
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(sources) = inner.adjacency_in.get(id) {
                for (source, kind) in sources {
                    if let Some(edge) = inner.edges.get(&(source.clone(), id.clone(), *kind)) {
                        out.push(edge.clone());
                    }
                }
            }
        }
        out
    }

    /// Textual seed scoring (spec.md §4.1): case-insensitive tokenization,
    /// combining exact token match, substring match, and prefix match;
    /// ties are broken by the caller using `confidence` then
    /// `last_updated`.
    #[must_use]
    pub fn find_seeds(
        &self,
        query_text: &str,
        type_filter: Option<NodeKind>,
        limit: usize,
    ) -> Vec<SeedMatch> {
        let inner = self.inner.read();
        let query_tokens: HashSet<String> = tokenize(query_text).into_iter().collect();
        let query_lc = query_text.to_lowercase();

        let mut scored: Vec<(NodeId, f64, f64, chrono::DateTime<Utc>)> = Vec::new();

        let candidate_ids: HashSet<NodeId> = if let Some(kind) = type_filter {
            inner.by_kind.get(&kind).cloned().unwrap_or_default()
        } else {
            inner.nodes.keys().cloned().collect()
        };

        for id in candidate_ids {
            let Some(node) = inner.nodes.get(&id) else {
                continue;
            };
            let name_tokens: HashSet<String> = tokenize(&node.name).into_iter().collect();
            let path_tokens: HashSet<String> = node
                .path
                .as_ref()
                .map(|p| tokenize(p).into_iter().collect())
                .unwrap_or_default();

            if query_tokens.is_empty() {
                continue;
            }

            let mut score = 0.0;

            // Whole-name exact token-set match scores highest.
            if name_tokens == query_tokens {
                score += 3.0;
            } else {
                let exact_matches = query_tokens.intersection(&name_tokens).count()
                    + query_tokens.intersection(&path_tokens).count();
                score += exact_matches as f64;
            }

            let name_lc = node.name.to_lowercase();
            let path_lc = node.path.as_ref().map(|p| p.to_lowercase());
            if name_lc.contains(&query_lc) || path_lc.as_deref().is_some_and(|p| p.contains(&query_lc))
            {
                score += 0.5;
            }

            let prefix_matches = name_tokens
                .iter()
                .chain(path_tokens.iter())
                .filter(|t| query_tokens.iter().any(|q| t.starts_with(q.as_str())))
                .count();
            score += prefix_matches as f64 * 0.3;

            if score > 0.0 {
                scored.push((node.id.clone(), score, node.confidence, node.last_updated));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| b.3.cmp(&a.3))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(node_id, score, _, _)| SeedMatch {
                node_id,
                textual_score: score,
            })
            .collect()
    }

    /// Number of nodes currently stored.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Number of edges currently stored.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }

    /// Node counts grouped by kind, for `get_stats` (spec.md §6.2).
    #[must_use]
    pub fn nodes_by_kind(&self) -> HashMap<NodeKind, usize> {
        self.inner
            .read()
            .by_kind
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect()
    }

    /// Mean node confidence, for `get_stats` (spec.md §6.2).
    #[must_use]
    pub fn average_confidence(&self) -> f64 {
        let inner = self.inner.read();
        if inner.nodes.is_empty() {
            return 0.0;
        }
        let sum: f64 = inner.nodes.values().map(|n| n.confidence).sum();
        sum / inner.nodes.len() as f64
    }

    /// Record a task association on an existing node's metadata, used by
    /// `update_from_task` (spec.md §6.2) to feed `success_history` in the
    /// ranking fuser.
    pub fn record_task(&self, id: &NodeId, record: TaskRecord) {
        let mut inner = self.inner.write();
        if let Some(node) = inner.nodes.get_mut(id) {
            node.metadata.push_task(record, self.max_tasks_per_node);
            node.last_updated = Utc::now();
        }
    }

    /// Snapshot all nodes, for serialization (C8).
    #[must_use]
    pub fn all_nodes(&self) -> Vec<Node> {
        self.inner.read().nodes.values().cloned().collect()
    }

    /// Snapshot all edges, for serialization (C8).
    #[must_use]
    pub fn all_edges(&self) -> Vec<Edge> {
        self.inner.read().edges.values().cloned().collect()
    }

    /// Edges of `kind` whose weight, after multiplying by `decay_rate`,
    /// falls below `prune_threshold` are removed; the rest are weakened in
    /// place. Used by the Hebbian learner's periodic decay tick and the
    /// inhibition filter's pattern aging (spec.md §4.4, §4.5). Only edges
    /// last reinforced before `cutoff` are touched, so freshly reinforced
    /// edges survive a tick untouched.
    pub fn apply_edge_decay(
        &self,
        kind: EdgeKind,
        cutoff: chrono::DateTime<Utc>,
        decay_rate: f64,
        prune_threshold: f64,
    ) -> usize {
        let mut inner = self.inner.write();
        let stale: Vec<(NodeId, NodeId, EdgeKind)> = inner
            .edges
            .iter()
            .filter(|(k, e)| k.2 == kind && e.last_reinforced < cutoff)
            .map(|(k, _)| k.clone())
            .collect();

        let mut pruned = 0;
        for key in stale {
            let should_prune = {
                let edge = inner.edges.get_mut(&key).expect("key just collected from this map");
                edge.weight = clamp01(edge.weight * decay_rate);
                edge.weight < prune_threshold
            };
            if should_prune {
                inner.edges.remove(&key);
                if let Some(out_list) = inner.adjacency_out.get_mut(&key.0) {
                    out_list.retain(|(tgt, k)| !(tgt == &key.1 && *k == key.2));
                }
                if let Some(in_list) = inner.adjacency_in.get_mut(&key.1) {
                    in_list.retain(|(src, k)| !(src == &key.0 && *k == key.2));
                }
                pruned += 1;
            }
        }
        pruned
    }

    /// All edges of a given kind touching `id`, with the neighbor id
    /// resolved, in either direction. Used by the Hebbian learner to find
    /// existing co-activation neighbors.
    #[must_use]
    pub fn edges_of_kind(&self, id: &NodeId, kind: EdgeKind) -> Vec<Edge> {
        self.neighbors(id, Direction::Both)
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    /// Bulk-load nodes and edges, used when restoring from a snapshot.
    /// Edges whose endpoints are missing are dropped rather than rejected,
    /// since a snapshot should never fail to load wholesale over one bad
    /// edge (spec.md §7, `StorageError` recovery policy).
    pub fn load(&self, nodes: Vec<Node>, edges: Vec<Edge>) {
        let mut inner = self.inner.write();
        *inner = GraphInner::default();
        for node in nodes {
            inner.by_kind.entry(node.kind).or_default().insert(node.id.clone());
            inner.index_node_tokens(&node);
            inner.nodes.insert(node.id.clone(), node);
        }
        for edge in edges {
            if !inner.nodes.contains_key(&edge.source) || !inner.nodes.contains_key(&edge.target) {
                continue;
            }
            inner
                .adjacency_out
                .entry(edge.source.clone())
                .or_default()
                .push((edge.target.clone(), edge.kind));
            inner
                .adjacency_in
                .entry(edge.target.clone())
                .or_default()
                .push((edge.source.clone(), edge.kind));
            inner
                .edges
                .insert((edge.source.clone(), edge.target.clone(), edge.kind), edge);
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(
            crate::constants::defaults::MAX_TASKS_PER_NODE,
            crate::constants::defaults::REINFORCEMENT_ETA,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: NodeKind, name: &str) -> Node {
        Node::new(id, kind, name)
    }

    #[test]
    fn add_node_inserts_then_merges() {
        let store = GraphStore::default();
        assert!(matches!(
            store.add_node(node("a", NodeKind::File, "a.rs")),
            AddNodeOutcome::Inserted
        ));
        let mut second = node("a", NodeKind::File, "a.rs").with_confidence(0.9);
        second.languages.insert("rust".to_string());
        let outcome = store.add_node(second);
        assert!(matches!(outcome, AddNodeOutcome::Merged(_)));
        assert_eq!(store.node_count(), 1);
        let merged = store.get_node(&NodeId::from("a")).unwrap();
        assert!(merged.languages.contains("rust"));
    }

    #[test]
    fn add_edge_rejects_missing_endpoints() {
        let store = GraphStore::default();
        store.add_node(node("a", NodeKind::File, "a.rs"));
        let edge = Edge::new(NodeId::from("a"), NodeId::from("missing"), EdgeKind::Contains, 0.5, 0.5);
        assert!(matches!(store.add_edge(edge), Err(Error::InvalidReference(_))));
    }

    #[test]
    fn add_edge_dedups_and_reinforces() {
        let store = GraphStore::default();
        store.add_node(node("a", NodeKind::File, "a.rs"));
        store.add_node(node("b", NodeKind::Function, "b"));
        let edge = Edge::new(NodeId::from("a"), NodeId::from("b"), EdgeKind::Contains, 0.5, 0.5);
        assert!(matches!(store.add_edge(edge.clone()), Ok(AddEdgeOutcome::Inserted)));
        assert!(matches!(store.add_edge(edge), Ok(AddEdgeOutcome::Reinforced)));
        assert_eq!(store.edge_count(), 1);
        let edges = store.neighbors(&NodeId::from("a"), Direction::Out);
        assert_eq!(edges.len(), 1);
        assert!(edges[0].weight > 0.5);
        assert_eq!(edges[0].activation_count, 1);
    }

    #[test]
    fn remove_node_cascades_edges() {
        let store = GraphStore::default();
        store.add_node(node("a", NodeKind::File, "a.rs"));
        store.add_node(node("b", NodeKind::Function, "b"));
        store
            .add_edge(Edge::new(NodeId::from("a"), NodeId::from("b"), EdgeKind::Contains, 0.5, 0.5))
            .unwrap();
        let removed = store.remove_node(&NodeId::from("a"));
        assert!(removed.is_some());
        assert_eq!(store.edge_count(), 0);
        assert!(store.neighbors(&NodeId::from("b"), Direction::In).is_empty());
    }

    #[test]
    fn find_seeds_ranks_whole_name_match_highest() {
        let store = GraphStore::default();
        store.add_node(node("f", NodeKind::File, "MindMapEngine.ts"));
        store.add_node(node("c", NodeKind::Class, "MindMapEngine"));
        store.add_node(node("m", NodeKind::Function, "query"));

        let seeds = store.find_seeds("MindMapEngine", None, 16);
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].node_id, NodeId::from("c"));
        assert_eq!(seeds[1].node_id, NodeId::from("f"));
    }

    #[test]
    fn find_seeds_respects_type_filter() {
        let store = GraphStore::default();
        store.add_node(node("f", NodeKind::File, "auth.rs"));
        store.add_node(node("c", NodeKind::Class, "AuthHandler"));
        let seeds = store.find_seeds("auth", Some(NodeKind::Class), 16);
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].node_id, NodeId::from("c"));
    }

    #[test]
    fn invariant_p1_edges_always_reference_existing_nodes() {
        let store = GraphStore::default();
        store.add_node(node("a", NodeKind::File, "a.rs"));
        store.add_node(node("b", NodeKind::Function, "b"));
        store
            .add_edge(Edge::new(NodeId::from("a"), NodeId::from("b"), EdgeKind::Contains, 0.5, 0.5))
            .unwrap();
        for edge in store.all_edges() {
            assert!(store.node_exists(&edge.source));
            assert!(store.node_exists(&edge.target));
        }
    }
}
