//! Graph Store (C1): typed nodes and directed edges with adjacency indices,
//! a case-folded token index for textual seeding, and confidence/recency
//! attributes (spec.md §4.1).

pub mod index;
pub mod store;

pub use store::{AddEdgeOutcome, AddNodeOutcome, GraphStore, SeedMatch};
