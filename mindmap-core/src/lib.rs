//! Associative knowledge graph engine: a typed node/edge store with
//! spreading-activation retrieval, Hebbian co-activation learning,
//! failure-inhibition filtering, and multi-signal ranking, fronted by a
//! query pipeline and a bounded result cache.
//!
//! Modules map one-to-one onto the component design: [`graph`] (store),
//! [`cache`] (query cache), [`activation`] (spreading engine),
//! [`hebbian`] (co-activation learner), [`inhibition`] (failure filter),
//! [`ranking`] (signal fusion), [`pipeline`] (orchestration), and
//! [`snapshot`] (persistence).

pub mod activation;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod hebbian;
pub mod inhibition;
pub mod pipeline;
pub mod ranking;
pub mod snapshot;
pub mod types;

pub use config::MindMapConfig;
pub use error::{Error, Result};
pub use pipeline::{MindMap, QueryRequest, QueryResponse};
