#![forbid(unsafe_code)]

//! SQL backend capability interface.
//!
//! The coordinator talks to storage only through [`SqlBackend`]. A backend
//! owns its dialect, DDL and connection; the coordinator decides *when* rows
//! are written. Every call is synchronous and the connection is used from a
//! single thread.

mod registry;
mod sqlite;

use serde::Serialize;

use crate::types::{
    AttrId, BackendError, EdgeId, ElementKind, GraphId, SeqNum, TypeId, VertexId,
};

pub use registry::BackendRegistry;
pub use sqlite::{SqliteBackend, SyncMode};

/// Result alias for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Stored graph row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphRow {
    /// Graph id.
    pub id: GraphId,
    /// Unique graph name.
    pub name: String,
    /// Structural version.
    pub version: u64,
    /// Vertex-list version.
    pub vertex_list_version: u64,
    /// Edge-list version.
    pub edge_list_version: u64,
}

/// Stored vertex row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexRow {
    /// Vertex id.
    pub id: VertexId,
    /// Schema type.
    pub type_id: TypeId,
    /// Key in the vertex list.
    pub seq: SeqNum,
    /// Incidence-list version.
    pub incidence_version: u64,
}

/// Stored edge row joined with both of its incidences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRow {
    /// Normal edge id.
    pub id: EdgeId,
    /// Schema type.
    pub type_id: TypeId,
    /// Key in the edge list.
    pub seq: SeqNum,
    /// Start vertex.
    pub alpha: VertexId,
    /// End vertex.
    pub omega: VertexId,
    /// Key of the normal id in `alpha`'s incidence list.
    pub alpha_seq: SeqNum,
    /// Key of the reversed id in `omega`'s incidence list.
    pub omega_seq: SeqNum,
}

/// One entry of a vertex's incidence list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncidenceRow {
    /// Signed edge id as seen from the vertex.
    pub edge: EdgeId,
    /// Key in the incidence list.
    pub seq: SeqNum,
}

/// Stored attribute value in encoded form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrRow {
    /// Attribute id.
    pub attr: AttrId,
    /// Encoded value.
    pub value: String,
}

/// Row-level storage operations used by the coordinator.
///
/// The three `renumber_*` operations rewrite every key of one list: rows are
/// taken in their current key order and given `start`, `start + distance`,
/// `start + 2 * distance`, and so on.
pub trait SqlBackend {
    /// Vendor name, for logs and reports.
    fn vendor(&self) -> &'static str;

    /// Starts a transaction.
    fn begin(&self) -> BackendResult<()>;
    /// Commits the open transaction.
    fn commit(&self) -> BackendResult<()>;
    /// Rolls the open transaction back.
    fn rollback(&self) -> BackendResult<()>;
    /// Returns `true` while a transaction is open.
    fn in_transaction(&self) -> bool;

    /// Returns the stored ids of `types` in schema `schema`, registering
    /// missing ones.
    fn register_types(
        &self,
        schema: &str,
        types: &[(ElementKind, &str)],
    ) -> BackendResult<Vec<TypeId>>;
    /// Returns the stored ids of the attributes of one type, registering
    /// missing ones.
    fn register_attrs(
        &self,
        schema: &str,
        type_id: TypeId,
        names: &[&str],
    ) -> BackendResult<Vec<AttrId>>;

    /// Inserts a new graph row and returns its id.
    fn insert_graph(&self, name: &str) -> BackendResult<GraphId>;
    /// Graph row by name.
    fn fetch_graph(&self, name: &str) -> BackendResult<Option<GraphRow>>;
    /// All graph rows ordered by name.
    fn graphs(&self) -> BackendResult<Vec<GraphRow>>;
    /// Deletes a graph with every row that belongs to it.
    fn delete_graph(&self, graph: GraphId) -> BackendResult<()>;
    /// Stores the structural version.
    fn update_graph_version(&self, graph: GraphId, version: u64) -> BackendResult<()>;
    /// Stores the vertex- and edge-list versions.
    fn update_list_versions(
        &self,
        graph: GraphId,
        vertex_list: u64,
        edge_list: u64,
    ) -> BackendResult<()>;

    /// Inserts a vertex row.
    fn insert_vertex(&self, graph: GraphId, row: &VertexRow) -> BackendResult<()>;
    /// Vertex row by id.
    fn fetch_vertex(&self, graph: GraphId, vertex: VertexId) -> BackendResult<Option<VertexRow>>;
    /// Deletes a vertex row.
    fn delete_vertex(&self, graph: GraphId, vertex: VertexId) -> BackendResult<()>;
    /// Stores a vertex's key in the vertex list.
    fn update_vertex_seq(&self, graph: GraphId, vertex: VertexId, seq: SeqNum)
        -> BackendResult<()>;
    /// Increments a vertex's incidence-list version.
    fn bump_incidence_version(&self, graph: GraphId, vertex: VertexId) -> BackendResult<()>;
    /// `(id, key)` of every vertex in key order.
    fn vertex_order(&self, graph: GraphId) -> BackendResult<Vec<(VertexId, SeqNum)>>;
    /// Renumbers the vertex list.
    fn renumber_vertex_list(
        &self,
        graph: GraphId,
        start: SeqNum,
        distance: SeqNum,
    ) -> BackendResult<()>;

    /// Inserts an edge row. Incidences are inserted separately.
    fn insert_edge(&self, graph: GraphId, row: &EdgeRow) -> BackendResult<()>;
    /// Edge row by normal id, joined with its incidences.
    fn fetch_edge(&self, graph: GraphId, edge: EdgeId) -> BackendResult<Option<EdgeRow>>;
    /// Deletes an edge row.
    fn delete_edge(&self, graph: GraphId, edge: EdgeId) -> BackendResult<()>;
    /// Stores an edge's key in the edge list.
    fn update_edge_seq(&self, graph: GraphId, edge: EdgeId, seq: SeqNum) -> BackendResult<()>;
    /// `(id, key)` of every edge in key order.
    fn edge_order(&self, graph: GraphId) -> BackendResult<Vec<(EdgeId, SeqNum)>>;
    /// Renumbers the edge list.
    fn renumber_edge_list(&self, graph: GraphId, start: SeqNum, distance: SeqNum)
        -> BackendResult<()>;

    /// Inserts one incidence of `vertex`.
    fn insert_incidence(
        &self,
        graph: GraphId,
        vertex: VertexId,
        row: IncidenceRow,
    ) -> BackendResult<()>;
    /// Deletes both incidences of the edge.
    fn delete_incidences(&self, graph: GraphId, edge: EdgeId) -> BackendResult<()>;
    /// Stores the key of a signed edge id in `vertex`'s incidence list.
    fn update_incidence_seq(
        &self,
        graph: GraphId,
        vertex: VertexId,
        edge: EdgeId,
        seq: SeqNum,
    ) -> BackendResult<()>;
    /// Incidences of `vertex` in key order.
    fn incidences(&self, graph: GraphId, vertex: VertexId) -> BackendResult<Vec<IncidenceRow>>;
    /// Renumbers one vertex's incidence list.
    fn renumber_incidence_list(
        &self,
        graph: GraphId,
        vertex: VertexId,
        start: SeqNum,
        distance: SeqNum,
    ) -> BackendResult<()>;

    /// Inserts attribute values of one element.
    fn insert_attributes(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
        values: &[AttrRow],
    ) -> BackendResult<()>;
    /// Attribute values of one element.
    fn fetch_attributes(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
    ) -> BackendResult<Vec<AttrRow>>;
    /// Writes one attribute value, inserting the row if needed.
    fn update_attribute(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
        value: &AttrRow,
    ) -> BackendResult<()>;
    /// Deletes every attribute value of one element.
    fn delete_attributes(&self, graph: GraphId, kind: ElementKind, element: i64)
        -> BackendResult<()>;
}
