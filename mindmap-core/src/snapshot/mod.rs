//! Snapshot I/O (C8): atomic persistence of the graph and inhibition
//! patterns under a `.mindmap-cache/` directory (spec.md §4.8, §6.3).
//! Hebbian state needs no separate file: `co_activates`/`relates_to`
//! edges already round-trip through the graph snapshot. Grounded in the
//! teacher's persistence manager
//! (`memory-storage-redb/src/persistence/mod.rs`), but where the teacher
//! writes the target file directly, we write to a sibling `.tmp` file,
//! `fsync` it, then rename over the target — a plain `fs::write` can
//! leave a half-written file behind if the process dies mid-write, and
//! spec.md §6.3 requires snapshots to never be observed partially
//! written.

use crate::constants::defaults;
use crate::inhibition::Pattern;
use crate::types::{Edge, Node, NodeId};
use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The graph's on-disk shape. Accepts either the verbose field names or
/// the compact `n`/`e` aliases, so snapshots written by older or
/// space-conscious producers still load (spec.md §6.3).
#[derive(Debug, Clone, Default, Serialize, serde::Deserialize)]
pub struct GraphSnapshot {
    #[serde(alias = "n")]
    pub nodes: Vec<Node>,
    #[serde(alias = "e")]
    pub edges: Vec<Edge>,
}

#[must_use]
pub fn snapshot_dir(base: &Path) -> PathBuf {
    base.join(defaults::SNAPSHOT_DIR_NAME)
}

#[must_use]
pub fn graph_snapshot_path(base: &Path) -> PathBuf {
    snapshot_dir(base).join(defaults::SNAPSHOT_FILE_NAME)
}

#[must_use]
pub fn inhibition_snapshot_path(base: &Path) -> PathBuf {
    snapshot_dir(base).join(defaults::INHIBITION_FILE_NAME)
}

/// The inhibition store's on-disk shape: every node's recorded failure
/// patterns, keyed by node id.
#[derive(Debug, Clone, Default, Serialize, serde::Deserialize)]
pub struct InhibitionSnapshot {
    pub patterns: HashMap<NodeId, Vec<Pattern>>,
}

/// Serialize `value` to `path` via a temp file + `fsync` + rename, so
/// readers never observe a partially written file.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(value)?;

    let mut file = File::create(&tmp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Deserialize from `path`, returning `Ok(None)` if it does not exist.
/// A file that exists but fails to parse is a `Storage` error rather than
/// a silent `None`, since that usually means corruption worth surfacing
/// (spec.md §7).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Storage(format!("corrupt snapshot at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Persist the full node/edge set.
pub fn save_graph(base: &Path, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
    atomic_write_json(&graph_snapshot_path(base), &GraphSnapshot { nodes, edges })
}

/// Load the full node/edge set, if a snapshot exists.
pub fn load_graph(base: &Path) -> Result<Option<GraphSnapshot>> {
    read_json(&graph_snapshot_path(base))
}

/// Persist every node's recorded failure patterns.
pub fn save_inhibition(base: &Path, patterns: HashMap<NodeId, Vec<Pattern>>) -> Result<()> {
    atomic_write_json(&inhibition_snapshot_path(base), &InhibitionSnapshot { patterns })
}

/// Load recorded failure patterns, if a snapshot exists.
pub fn load_inhibition(base: &Path) -> Result<Option<InhibitionSnapshot>> {
    read_json(&inhibition_snapshot_path(base))
}
