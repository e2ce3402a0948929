use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::metrics::GraphMetrics;

/// When vertex- and edge-list versions reach the backend.
///
/// The graph's structural version and every per-vertex incidence version are
/// always written through. The two global list versions are change-detection
/// counters only; they never influence ordering, so they may be batched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionWriteBack {
    /// Write every bump immediately.
    WriteThrough,
    /// Keep bumps in memory until `flush_versions`, `close`, or drop. After
    /// an abnormal exit the stored list versions may lag.
    #[default]
    OnFlush,
}

/// Configuration options supplied when opening a [`super::GraphDatabase`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDbOptions {
    /// Vertices kept alive by the vertex cache.
    pub vertex_cache_capacity: usize,
    /// Edges kept alive by the edge cache.
    pub edge_cache_capacity: usize,
    /// Cache accesses between housekeeping passes.
    pub cache_maintenance_interval: usize,
    /// Initial size of each graph's vertex id pool.
    pub initial_vertex_capacity: u32,
    /// Initial size of each graph's edge id pool.
    pub initial_edge_capacity: u32,
    /// Write-back policy for list versions.
    pub version_write_back: VersionWriteBack,
    /// Optional metrics collection implementation.
    #[serde(skip)]
    pub metrics: Option<Arc<dyn GraphMetrics>>,
}

impl fmt::Debug for GraphDbOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDbOptions")
            .field("vertex_cache_capacity", &self.vertex_cache_capacity)
            .field("edge_cache_capacity", &self.edge_cache_capacity)
            .field("cache_maintenance_interval", &self.cache_maintenance_interval)
            .field("initial_vertex_capacity", &self.initial_vertex_capacity)
            .field("initial_edge_capacity", &self.initial_edge_capacity)
            .field("version_write_back", &self.version_write_back)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl Default for GraphDbOptions {
    fn default() -> Self {
        Self {
            vertex_cache_capacity: 4096,
            edge_cache_capacity: 8192,
            cache_maintenance_interval: 1000,
            initial_vertex_capacity: 1024,
            initial_edge_capacity: 1024,
            version_write_back: VersionWriteBack::OnFlush,
            metrics: None,
        }
    }
}

impl GraphDbOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vertex cache capacity.
    pub fn vertex_cache_capacity(mut self, capacity: usize) -> Self {
        self.vertex_cache_capacity = capacity;
        self
    }

    /// Sets the edge cache capacity.
    pub fn edge_cache_capacity(mut self, capacity: usize) -> Self {
        self.edge_cache_capacity = capacity;
        self
    }

    /// Sets the number of cache accesses between housekeeping passes.
    pub fn cache_maintenance_interval(mut self, accesses: usize) -> Self {
        self.cache_maintenance_interval = accesses;
        self
    }

    /// Sets the initial vertex id pool size.
    pub fn initial_vertex_capacity(mut self, capacity: u32) -> Self {
        self.initial_vertex_capacity = capacity;
        self
    }

    /// Sets the initial edge id pool size.
    pub fn initial_edge_capacity(mut self, capacity: u32) -> Self {
        self.initial_edge_capacity = capacity;
        self
    }

    /// Selects the list-version write-back policy.
    pub fn version_write_back(mut self, policy: VersionWriteBack) -> Self {
        self.version_write_back = policy;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
