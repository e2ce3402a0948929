use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::types::ListKind;

/// Trait for tracking graph operations performed by a graph database.
///
/// Implementations collect counts of element creation and deletion, list
/// reorganizations, cache lookups and backend fetches. The numbers are meant
/// for monitoring and tests, not for any decision inside the database.
pub trait GraphMetrics: Send + Sync {
    /// Records the creation of a vertex.
    fn vertex_created(&self);

    /// Records the deletion of a vertex.
    fn vertex_deleted(&self);

    /// Records the creation of an edge.
    fn edge_created(&self);

    /// Records the deletion of an edge.
    fn edge_deleted(&self);

    /// Records a full renumbering of one list.
    fn list_reorganized(&self, kind: ListKind);

    /// Records an element lookup against the cache.
    ///
    /// # Parameters
    /// * `hit` - Whether a live instance was found (`true`) or not (`false`).
    fn cache_lookup(&self, hit: bool);

    /// Records an element leaving the bounded cache tier.
    fn cache_evicted(&self);

    /// Records an element read from the backend.
    fn backend_fetch(&self);
}

/// A no-op implementation of [`GraphMetrics`] that discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn vertex_created(&self) {}
    fn vertex_deleted(&self) {}
    fn edge_created(&self) {}
    fn edge_deleted(&self) {}
    fn list_reorganized(&self, _kind: ListKind) {}
    fn cache_lookup(&self, _hit: bool) {}
    fn cache_evicted(&self) {}
    fn backend_fetch(&self) {}
}

/// A thread-safe counter-based implementation of [`GraphMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of vertices created.
    pub vertices_created: AtomicU64,

    /// Number of vertices deleted.
    pub vertices_deleted: AtomicU64,

    /// Number of edges created.
    pub edges_created: AtomicU64,

    /// Number of edges deleted.
    pub edges_deleted: AtomicU64,

    /// Number of vertex-list reorganizations.
    pub vertex_list_reorganizations: AtomicU64,

    /// Number of edge-list reorganizations.
    pub edge_list_reorganizations: AtomicU64,

    /// Number of incidence-list reorganizations, across all vertices.
    pub incidence_list_reorganizations: AtomicU64,

    /// Number of lookups served from the cache.
    pub cache_hits: AtomicU64,

    /// Number of lookups that missed the cache.
    pub cache_misses: AtomicU64,

    /// Number of cache evictions.
    pub cache_evictions: AtomicU64,

    /// Number of elements read from the backend.
    pub backend_fetches: AtomicU64,
}

/// Point-in-time copy of a [`CounterMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Vertices created.
    pub vertices_created: u64,
    /// Vertices deleted.
    pub vertices_deleted: u64,
    /// Edges created.
    pub edges_created: u64,
    /// Edges deleted.
    pub edges_deleted: u64,
    /// Vertex-list reorganizations.
    pub vertex_list_reorganizations: u64,
    /// Edge-list reorganizations.
    pub edge_list_reorganizations: u64,
    /// Incidence-list reorganizations.
    pub incidence_list_reorganizations: u64,
    /// Cache hits.
    pub cache_hits: u64,
    /// Cache misses.
    pub cache_misses: u64,
    /// Cache evictions.
    pub cache_evictions: u64,
    /// Backend fetches.
    pub backend_fetches: u64,
}

impl CounterMetrics {
    /// Reads every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            vertices_created: load(&self.vertices_created),
            vertices_deleted: load(&self.vertices_deleted),
            edges_created: load(&self.edges_created),
            edges_deleted: load(&self.edges_deleted),
            vertex_list_reorganizations: load(&self.vertex_list_reorganizations),
            edge_list_reorganizations: load(&self.edge_list_reorganizations),
            incidence_list_reorganizations: load(&self.incidence_list_reorganizations),
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            cache_evictions: load(&self.cache_evictions),
            backend_fetches: load(&self.backend_fetches),
        }
    }
}

impl GraphMetrics for CounterMetrics {
    fn vertex_created(&self) {
        self.vertices_created.fetch_add(1, Ordering::Relaxed);
    }

    fn vertex_deleted(&self) {
        self.vertices_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_created(&self) {
        self.edges_created.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_deleted(&self) {
        self.edges_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn list_reorganized(&self, kind: ListKind) {
        let counter = match kind {
            ListKind::Vertex => &self.vertex_list_reorganizations,
            ListKind::Edge => &self.edge_list_reorganizations,
            ListKind::Incidence => &self.incidence_list_reorganizations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn cache_evicted(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn backend_fetch(&self) {
        self.backend_fetches.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default implementation is [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics)
}
