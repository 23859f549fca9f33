//! Common types shared across the graph store, activation engine, learner,
//! inhibition filter, and ranking fuser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Clamp a value into `[0, 1]`, the invariant spec.md §3 requires of every
/// `confidence`, `weight`, and `strength` field (P7).
#[must_use]
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Reinforcement update: `x <- x + eta * (1 - x)`, diminishing-returns
/// growth toward 1.0 (spec.md GLOSSARY, "Reinforcement").
#[must_use]
pub fn reinforce(value: f64, eta: f64) -> f64 {
    clamp01(value + eta * (1.0 - value))
}

/// Stable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Stable edge identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        EdgeId(s.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        EdgeId(s)
    }
}

/// The closed set of node kinds (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
    Function,
    Class,
    Pattern,
    Error,
    Concept,
}

/// The closed set of edge kinds (spec.md §3). `Inhibits` edges never
/// participate in spreading activation (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Imports,
    Calls,
    Fixes,
    DependsOn,
    CoActivates,
    RelatesTo,
    Inhibits,
}

impl EdgeKind {
    /// Propagation weight used by the activation engine (spec.md §4.3).
    /// Returns `None` for `Inhibits`, which is excluded from spreading.
    #[must_use]
    pub fn propagation_weight(self) -> Option<f64> {
        use crate::constants::edge_weights::*;
        match self {
            EdgeKind::Contains => Some(CONTAINS),
            EdgeKind::Calls => Some(CALLS),
            EdgeKind::Imports => Some(IMPORTS),
            EdgeKind::Fixes => Some(FIXES),
            EdgeKind::DependsOn => Some(DEPENDS_ON),
            EdgeKind::CoActivates => Some(CO_ACTIVATES),
            EdgeKind::RelatesTo => Some(RELATES_TO),
            EdgeKind::Inhibits => None,
        }
    }
}

/// Outcome tag for a task recorded against a node, used to compute
/// `success_history` in the ranking fuser (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcomeTag {
    Success,
    Error,
    Partial,
}

/// A single task association recorded on a node's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub description: String,
    pub outcome: TaskOutcomeTag,
    pub recorded_at: DateTime<Utc>,
}

/// Typed interpretation of the free-form `metadata` map in spec.md §3, with
/// a catch-all for opaque producer data (spec.md §9, "Dynamic property
/// bags").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Bounded to `MAX_TASKS_PER_NODE` most recent entries (spec.md §4.1).
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub line_number: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    /// Opaque keys producers attach that the core does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeMetadata {
    /// Append a task record, keeping only the most recent `cap` entries.
    pub fn push_task(&mut self, record: TaskRecord, cap: usize) {
        self.tasks.push(record);
        if self.tasks.len() > cap {
            let overflow = self.tasks.len() - cap;
            self.tasks.drain(0..overflow);
        }
    }

    /// Count of tasks recorded with a successful outcome, used by the
    /// ranking fuser's `success_history` signal.
    #[must_use]
    pub fn successful_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.outcome == TaskOutcomeTag::Success)
            .count()
    }
}

/// A node in the graph store (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub path: Option<String>,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
    pub languages: HashSet<String>,
    pub frameworks: HashSet<String>,
    pub metadata: NodeMetadata,
}

impl Node {
    /// Construct a node with clamped confidence, as invariant P7 requires.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            path: None,
            confidence: 1.0,
            last_updated: Utc::now(),
            languages: HashSet::new(),
            frameworks: HashSet::new(),
            metadata: NodeMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp01(confidence);
        self
    }
}

/// A directed edge in the graph store (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub weight: f64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub last_reinforced: DateTime<Utc>,
    pub activation_count: u64,
    pub context_tag: Option<String>,
}

impl Edge {
    #[must_use]
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind, weight: f64, confidence: f64) -> Self {
        let now = Utc::now();
        Self {
            id: EdgeId(format!("{source}->{target}:{kind:?}")),
            source,
            target,
            kind,
            weight: clamp01(weight),
            confidence: clamp01(confidence),
            created_at: now,
            last_reinforced: now,
            activation_count: 0,
            context_tag: None,
        }
    }

    /// Apply the reinforcement rule from spec.md §4.1 in place.
    pub fn reinforce(&mut self, eta: f64) {
        self.weight = reinforce(self.weight, eta);
        self.confidence = reinforce(self.confidence, eta * 0.5);
        self.last_reinforced = Utc::now();
        self.activation_count += 1;
    }
}

/// Direction for graph traversal (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

/// Caller-supplied context for a query (spec.md §4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    pub current_task: Option<String>,
    #[serde(default)]
    pub active_files: Vec<String>,
    #[serde(default)]
    pub recent_errors: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}
