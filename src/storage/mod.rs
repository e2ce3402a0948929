//! Graph storage engine: ordered lists, element cache and persistence
//! coordination.
//!
//! A [`GraphDatabase`] owns the backend connection, the compiled schema and
//! the element caches. Each [`Graph`] handle keeps its vertex list, edge list
//! and per-vertex incidence lists in memory and writes every change through
//! the backend.

/// Reclaimable element cache.
pub mod cache;

/// Sequenced lists and their reorganization.
pub mod seq;

mod element;
mod graph;
mod graph_db;
mod metrics;
mod options;

pub use cache::{CacheStats, ElementCache};
pub use element::{Edge, EdgeRef, Vertex, VertexRef};
pub use graph::{Graph, GraphVersions};
pub use graph_db::GraphDatabase;

/// Metrics and monitoring.
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, MetricsSnapshot, NoopMetrics};

/// Database options.
pub use options::{GraphDbOptions, VersionWriteBack};

pub use seq::{Direction, EdgeList, IncidenceList, SequencedList, VertexList};
