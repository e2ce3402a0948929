use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{info, warn};

use super::cache::{CacheKey, CacheStats, ElementCache};
use super::element::{Edge, EdgeRef, Vertex, VertexRef};
use super::graph::Graph;
use super::metrics::{default_metrics, GraphMetrics};
use super::options::GraphDbOptions;
use crate::backend::{BackendRegistry, GraphRow, SqlBackend};
use crate::schema::{AttrFactory, Schema, SchemaRegistry};
use crate::types::{ElementKind, GraphId, Result, SeqGraphError};

/// State shared by every graph of one database.
pub(crate) struct DbContext {
    pub(crate) backend: Rc<dyn SqlBackend>,
    pub(crate) schema: SchemaRegistry,
    pub(crate) options: GraphDbOptions,
    pub(crate) metrics: Arc<dyn GraphMetrics>,
    pub(crate) vertices: RefCell<ElementCache<RefCell<Vertex>>>,
    pub(crate) edges: RefCell<ElementCache<RefCell<Edge>>>,
    pub(crate) open_graphs: RefCell<FxHashSet<GraphId>>,
}

/// Graphs stored in one backend under one schema.
///
/// The database owns the element caches and hands out [`Graph`] handles.
/// Each graph can be open at most once at a time; its handle is the single
/// writer for that graph.
pub struct GraphDatabase {
    ctx: DbContext,
}

impl fmt::Debug for GraphDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDatabase")
            .field("vendor", &self.ctx.backend.vendor())
            .field("schema", &self.ctx.schema.schema_name())
            .field("options", &self.ctx.options)
            .finish()
    }
}

impl GraphDatabase {
    /// Opens a database over the registry connection named `connection`.
    pub fn open(
        registry: &BackendRegistry,
        connection: &str,
        schema: &Schema,
        options: GraphDbOptions,
    ) -> Result<Self> {
        let backend = registry.get(connection)?;
        Self::with_backend(backend, schema, options)
    }

    /// Opens a database over an explicit backend.
    pub fn with_backend(
        backend: Rc<dyn SqlBackend>,
        schema: &Schema,
        options: GraphDbOptions,
    ) -> Result<Self> {
        let schema = SchemaRegistry::compile(schema, backend.as_ref())?;
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        let interval = options.cache_maintenance_interval;
        let mut vertices = ElementCache::new(options.vertex_cache_capacity, interval);
        let mut edges = ElementCache::new(options.edge_cache_capacity, interval);
        let on_vertex_evict = Arc::clone(&metrics);
        vertices.set_eviction_callback(Box::new(move |_: CacheKey, _: &VertexRef| {
            on_vertex_evict.cache_evicted()
        }));
        let on_edge_evict = Arc::clone(&metrics);
        edges.set_eviction_callback(Box::new(move |_: CacheKey, _: &EdgeRef| {
            on_edge_evict.cache_evicted()
        }));
        info!(
            vendor = backend.vendor(),
            schema = schema.schema_name(),
            "graph database opened"
        );
        Ok(Self {
            ctx: DbContext {
                backend,
                schema,
                options,
                metrics,
                vertices: RefCell::new(vertices),
                edges: RefCell::new(edges),
                open_graphs: RefCell::new(FxHashSet::default()),
            },
        })
    }

    /// Compiled schema.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.ctx.schema
    }

    /// Replaces the attribute factory of a vertex or edge type.
    pub fn register_factory(
        &mut self,
        kind: ElementKind,
        type_name: &str,
        factory: AttrFactory,
    ) -> Result<()> {
        let type_id = self.ctx.schema.type_id(kind, type_name)?;
        self.ctx.schema.register_factory(type_id, factory)
    }

    /// Backend connection.
    pub fn backend(&self) -> &dyn SqlBackend {
        self.ctx.backend.as_ref()
    }

    /// Options the database was opened with.
    pub fn options(&self) -> &GraphDbOptions {
        &self.ctx.options
    }

    /// Stored graphs ordered by name.
    pub fn graphs(&self) -> Result<Vec<GraphRow>> {
        Ok(self.ctx.backend.graphs()?)
    }

    /// Creates an empty graph called `name`.
    pub fn create_graph(&self, name: &str) -> Result<Graph<'_>> {
        if self.ctx.backend.fetch_graph(name)?.is_some() {
            return Err(SeqGraphError::Invalid("a graph with this name already exists"));
        }
        let id = self.ctx.backend.insert_graph(name)?;
        info!(graph = %id, name, "graph created");
        let row = GraphRow {
            id,
            name: name.to_owned(),
            version: 0,
            vertex_list_version: 0,
            edge_list_version: 0,
        };
        Graph::restore(&self.ctx, row)
    }

    /// Opens the stored graph `name`, restoring its lists from the backend.
    pub fn open_graph(&self, name: &str) -> Result<Option<Graph<'_>>> {
        match self.ctx.backend.fetch_graph(name)? {
            Some(row) => Graph::restore(&self.ctx, row).map(Some),
            None => Ok(None),
        }
    }

    /// Deletes the graph `name` with all of its elements. Returns `false` if
    /// no such graph exists.
    pub fn delete_graph(&self, name: &str) -> Result<bool> {
        let Some(row) = self.ctx.backend.fetch_graph(name)? else {
            return Ok(false);
        };
        if self.ctx.open_graphs.borrow().contains(&row.id) {
            return Err(SeqGraphError::Invalid("graph is open"));
        }
        self.ctx.backend.delete_graph(row.id)?;
        self.ctx.vertices.borrow_mut().clear_graph(row.id);
        self.ctx.edges.borrow_mut().clear_graph(row.id);
        info!(graph = %row.id, name, "graph deleted");
        Ok(true)
    }

    /// Vertex cache counters.
    pub fn vertex_cache_stats(&self) -> CacheStats {
        self.ctx.vertices.borrow().stats()
    }

    /// Edge cache counters.
    pub fn edge_cache_stats(&self) -> CacheStats {
        self.ctx.edges.borrow().stats()
    }

    /// Drops every cached element. Handles held by the application stay
    /// usable; later lookups fetch fresh instances from the backend.
    pub fn clear_caches(&self) {
        self.ctx.vertices.borrow_mut().clear();
        self.ctx.edges.borrow_mut().clear();
    }

    /// Starts a backend transaction.
    pub fn begin(&self) -> Result<()> {
        Ok(self.ctx.backend.begin()?)
    }

    /// Commits the backend transaction.
    pub fn commit(&self) -> Result<()> {
        Ok(self.ctx.backend.commit()?)
    }

    /// Rolls the backend transaction back. In-memory state is not restored.
    pub fn rollback(&self) -> Result<()> {
        Ok(self.ctx.backend.rollback()?)
    }

    /// Runs `body` inside one backend transaction, committing on success and
    /// rolling back on error.
    ///
    /// Only backend rows are rolled back. Graph handles touched by `body`
    /// keep their in-memory changes and should be closed and reopened after a
    /// failure.
    pub fn in_transaction<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<T> {
        self.begin()?;
        match body() {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.rollback() {
                    warn!(error = %rollback, "rollback after failed transaction body failed");
                }
                Err(err)
            }
        }
    }
}
