//! Persistence coordination for one graph.
//!
//! A [`Graph`] owns the graph's vertex and edge lists, its id pools and its
//! version counters. Every mutation goes through it: lists are updated
//! first, then rows are written through the backend, then the cache and the
//! version counters. Reads resolve against list membership, then the cache,
//! then the backend.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use super::element::VertexRef;
use super::graph_db::DbContext;
use super::seq::{EdgeList, SequencedList, VertexList};
use crate::backend::{AttrRow, GraphRow, SqlBackend};
use crate::primitives::FreeIndexPool;
use crate::schema::{decode_value, encode_value, AttrValue};
use crate::types::{AttrId, ElementKind, GraphId, Result, SeqGraphError, TypeId, VertexId};

mod attr_ops;
mod edge_ops;
mod order_ops;
mod vertex_ops;
mod versions;


pub use versions::GraphVersions;

/// Largest vertex index; vertex ids are unsigned 32-bit.
const VERTEX_ID_LIMIT: u32 = u32::MAX;
/// Largest edge index; edge ids are signed 32-bit.
const EDGE_ID_LIMIT: u32 = i32::MAX as u32;

/// Handle on one open graph.
pub struct Graph<'db> {
    ctx: &'db DbContext,
    id: GraphId,
    name: String,
    vertices: VertexList,
    edges: EdgeList,
    vertex_ids: FreeIndexPool,
    edge_ids: FreeIndexPool,
    versions: GraphVersions,
    versions_dirty: bool,
    loading: bool,
}

impl fmt::Debug for Graph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vertices", &self.vertices.len())
            .field("edges", &self.edges.len())
            .field("versions", &self.versions)
            .field("loading", &self.loading)
            .finish()
    }
}

impl<'db> Graph<'db> {
    /// Rebuilds the in-memory lists and id pools of a stored graph.
    pub(crate) fn restore(ctx: &'db DbContext, row: GraphRow) -> Result<Self> {
        if !ctx.open_graphs.borrow_mut().insert(row.id) {
            return Err(SeqGraphError::Invalid("graph is already open"));
        }
        match Self::load(ctx, &row) {
            Ok((vertices, edges, vertex_ids, edge_ids)) => {
                debug!(
                    graph = %row.id,
                    name = %row.name,
                    vertices = vertices.len(),
                    edges = edges.len(),
                    "graph restored"
                );
                Ok(Self {
                    ctx,
                    id: row.id,
                    name: row.name,
                    vertices,
                    edges,
                    vertex_ids,
                    edge_ids,
                    versions: GraphVersions {
                        graph: row.version,
                        vertex_list: row.vertex_list_version,
                        edge_list: row.edge_list_version,
                    },
                    versions_dirty: false,
                    loading: false,
                })
            }
            Err(err) => {
                ctx.open_graphs.borrow_mut().remove(&row.id);
                Err(err)
            }
        }
    }

    fn load(
        ctx: &DbContext,
        row: &GraphRow,
    ) -> Result<(VertexList, EdgeList, FreeIndexPool, FreeIndexPool)> {
        let vertex_rows = ctx.backend.vertex_order(row.id)?;
        let mut vertex_ids =
            FreeIndexPool::new(ctx.options.initial_vertex_capacity, VERTEX_ID_LIMIT);
        for &(id, _) in &vertex_rows {
            vertex_ids.reserve(id.index())?;
        }
        let vertices = VertexList::restore(vertex_rows)?;

        let edge_rows = ctx.backend.edge_order(row.id)?;
        let mut edge_ids = FreeIndexPool::new(ctx.options.initial_edge_capacity, EDGE_ID_LIMIT);
        for &(id, _) in &edge_rows {
            edge_ids.reserve(id.index())?;
        }
        let edges = EdgeList::restore(edge_rows)?;
        Ok((vertices, edges, vertex_ids, edge_ids))
    }

    /// Graph id.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global vertex order.
    pub fn vertex_list(&self) -> &VertexList {
        &self.vertices
    }

    /// Global edge order.
    pub fn edge_list(&self) -> &EdgeList {
        &self.edges
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` while per-row sequence and version writes are suppressed.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Suppresses (or resumes) per-row sequence writes and version writes.
    /// Version counters still advance in memory, and a reorganization still
    /// renumbers the stored rows in bulk. Used while replaying a graph whose
    /// rows are already correct in the backend.
    pub fn set_loading(&mut self, loading: bool) {
        debug!(graph = %self.id, loading, "loading mode changed");
        self.loading = loading;
    }

    pub(crate) fn backend(&self) -> &dyn SqlBackend {
        self.ctx.backend.as_ref()
    }

    /// Vertex and edge id pools.
    pub(crate) fn id_pools(&self) -> (&FreeIndexPool, &FreeIndexPool) {
        (&self.vertex_ids, &self.edge_ids)
    }

    /// Loaded instance of `id`, without fetching or touching recency.
    pub(crate) fn resident_vertex(&self, id: VertexId) -> Option<VertexRef> {
        self.ctx.vertices.borrow().peek(self.id, id.into())
    }

    /// Flushes deferred versions and releases the graph. The graph's cached
    /// instances are dropped, so a later `open_graph` reads from the backend.
    pub fn close(mut self) -> Result<()> {
        self.flush_versions()
    }

    fn initial_attrs(
        &self,
        type_id: TypeId,
        overrides: &[(&str, AttrValue)],
    ) -> Result<BTreeMap<AttrId, AttrValue>> {
        let schema = &self.ctx.schema;
        let mut attrs = schema.instantiate(type_id);
        for (name, value) in overrides {
            let info = schema.attr(type_id, name)?;
            check_domain(info.name.as_str(), info.domain, value)?;
            attrs.insert(info.id, value.clone());
        }
        Ok(attrs)
    }

    fn load_attrs(
        &self,
        kind: ElementKind,
        type_id: TypeId,
        element: i64,
    ) -> Result<BTreeMap<AttrId, AttrValue>> {
        let info = self
            .ctx
            .schema
            .type_info(type_id)
            .ok_or(SeqGraphError::Invalid("stored type is not part of the schema"))?;
        let mut attrs = self.ctx.schema.instantiate(type_id);
        for row in self.ctx.backend.fetch_attributes(self.id, kind, element)? {
            let Some(attr) = info.attr_by_id(row.attr) else {
                warn!(graph = %self.id, %kind, element, attr = %row.attr, "skipping unknown stored attribute");
                continue;
            };
            attrs.insert(row.attr, decode_value(attr.domain, &row.value)?);
        }
        Ok(attrs)
    }

    fn store_attrs(
        &self,
        kind: ElementKind,
        element: i64,
        attrs: &BTreeMap<AttrId, AttrValue>,
    ) -> Result<()> {
        let rows = attrs
            .iter()
            .map(|(&attr, value)| {
                Ok(AttrRow {
                    attr,
                    value: encode_value(value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.ctx
            .backend
            .insert_attributes(self.id, kind, element, &rows)?;
        Ok(())
    }
}

impl Drop for Graph<'_> {
    fn drop(&mut self) {
        if self.versions_dirty {
            if let Err(err) = self.flush_versions() {
                warn!(graph = %self.id, error = %err, "failed to flush list versions on drop");
            }
        }
        self.ctx.vertices.borrow_mut().clear_graph(self.id);
        self.ctx.edges.borrow_mut().clear_graph(self.id);
        self.ctx.open_graphs.borrow_mut().remove(&self.id);
    }
}

fn check_domain(name: &str, domain: crate::schema::AttrDomain, value: &AttrValue) -> Result<()> {
    if domain.accepts(value) {
        Ok(())
    } else {
        Err(SeqGraphError::DomainMismatch {
            name: name.to_owned(),
            expected: domain.name(),
            actual: value.kind_name(),
        })
    }
}
