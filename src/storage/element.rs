//! In-memory vertex and edge instances.
//!
//! Instances are shared through [`VertexRef`] / [`EdgeRef`] handles. The
//! coordinator owns every mutation; applications only read through the
//! accessors below. A deleted instance keeps its last values but reports
//! `is_valid() == false` forever.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::schema::AttrValue;
use crate::storage::seq::IncidenceList;
use crate::types::{
    AttrId, EdgeId, ElementKind, GraphId, Result, SeqGraphError, SeqNum, TypeId, VertexId,
};

/// Shared handle on a loaded vertex.
pub type VertexRef = Rc<RefCell<Vertex>>;
/// Shared handle on a loaded edge.
pub type EdgeRef = Rc<RefCell<Edge>>;

pub(crate) mod flags {
    /// Rows for the element exist in the backend.
    pub const PERSISTENT: u8 = 0b001;
    /// Construction finished; later attribute changes are written through.
    pub const INITIALIZED: u8 = 0b010;
    /// The element was deleted; the instance is dead.
    pub const DELETED: u8 = 0b100;
}

/// A vertex together with its attributes and incidence order.
#[derive(Debug)]
pub struct Vertex {
    pub(crate) graph: GraphId,
    pub(crate) id: VertexId,
    pub(crate) type_id: TypeId,
    pub(crate) seq: SeqNum,
    pub(crate) flags: u8,
    pub(crate) attrs: BTreeMap<AttrId, AttrValue>,
    pub(crate) incidences: IncidenceList,
    pub(crate) incidence_version: u64,
}

impl Vertex {
    pub(crate) fn new(
        graph: GraphId,
        type_id: TypeId,
        attrs: BTreeMap<AttrId, AttrValue>,
    ) -> Self {
        Self {
            graph,
            id: VertexId::UNASSIGNED,
            type_id,
            seq: 0,
            flags: 0,
            attrs,
            incidences: IncidenceList::new(VertexId::UNASSIGNED),
            incidence_version: 0,
        }
    }

    /// Owning graph.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Vertex id; [`VertexId::UNASSIGNED`] until the vertex is created.
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Schema type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Key in the graph's vertex list.
    pub fn seq(&self) -> SeqNum {
        self.seq
    }

    /// Value of attribute `id`.
    pub fn attr(&self, id: AttrId) -> Option<&AttrValue> {
        self.attrs.get(&id)
    }

    /// All attribute values keyed by attribute id.
    pub fn attrs(&self) -> &BTreeMap<AttrId, AttrValue> {
        &self.attrs
    }

    /// Local edge order of this vertex.
    pub fn incidences(&self) -> &IncidenceList {
        &self.incidences
    }

    /// Change counter of the incidence list.
    pub fn incidence_version(&self) -> u64 {
        self.incidence_version
    }

    /// `false` once the vertex has been deleted.
    pub fn is_valid(&self) -> bool {
        self.flags & flags::DELETED == 0
    }

    /// Returns `true` if rows for the vertex exist in the backend.
    pub fn is_persistent(&self) -> bool {
        self.flags & flags::PERSISTENT != 0
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.flags & flags::INITIALIZED != 0
    }

    pub(crate) fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SeqGraphError::InvalidElement(ElementKind::Vertex))
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.flags = flags::DELETED;
    }
}

/// An edge between two vertices.
///
/// The edge is stored once, under its normal (positive) id. A signed
/// [`EdgeId`] selects which end is "this" vertex: the normal view starts at
/// `alpha`, the reversed view at `omega`.
#[derive(Debug)]
pub struct Edge {
    pub(crate) graph: GraphId,
    pub(crate) id: EdgeId,
    pub(crate) type_id: TypeId,
    pub(crate) seq: SeqNum,
    pub(crate) flags: u8,
    pub(crate) attrs: BTreeMap<AttrId, AttrValue>,
    pub(crate) alpha: VertexId,
    pub(crate) omega: VertexId,
    pub(crate) alpha_seq: SeqNum,
    pub(crate) omega_seq: SeqNum,
}

impl Edge {
    pub(crate) fn new(
        graph: GraphId,
        type_id: TypeId,
        alpha: VertexId,
        omega: VertexId,
        attrs: BTreeMap<AttrId, AttrValue>,
    ) -> Self {
        Self {
            graph,
            id: EdgeId::UNASSIGNED,
            type_id,
            seq: 0,
            flags: 0,
            attrs,
            alpha,
            omega,
            alpha_seq: 0,
            omega_seq: 0,
        }
    }

    /// Owning graph.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Normal (positive) edge id.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Schema type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Key in the graph's edge list.
    pub fn seq(&self) -> SeqNum {
        self.seq
    }

    /// Start vertex.
    pub fn alpha(&self) -> VertexId {
        self.alpha
    }

    /// End vertex.
    pub fn omega(&self) -> VertexId {
        self.omega
    }

    /// Key of the normal id in `alpha`'s incidence list.
    pub fn alpha_seq(&self) -> SeqNum {
        self.alpha_seq
    }

    /// Key of the reversed id in `omega`'s incidence list.
    pub fn omega_seq(&self) -> SeqNum {
        self.omega_seq
    }

    /// Vertex the signed `view` starts from.
    pub fn this_vertex(&self, view: EdgeId) -> VertexId {
        if view.is_normal() {
            self.alpha
        } else {
            self.omega
        }
    }

    /// Vertex the signed `view` points to.
    pub fn that_vertex(&self, view: EdgeId) -> VertexId {
        if view.is_normal() {
            self.omega
        } else {
            self.alpha
        }
    }

    /// Value of attribute `id`.
    pub fn attr(&self, id: AttrId) -> Option<&AttrValue> {
        self.attrs.get(&id)
    }

    /// All attribute values keyed by attribute id.
    pub fn attrs(&self) -> &BTreeMap<AttrId, AttrValue> {
        &self.attrs
    }

    /// `false` once the edge has been deleted.
    pub fn is_valid(&self) -> bool {
        self.flags & flags::DELETED == 0
    }

    /// Returns `true` if rows for the edge exist in the backend.
    pub fn is_persistent(&self) -> bool {
        self.flags & flags::PERSISTENT != 0
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.flags & flags::INITIALIZED != 0
    }

    pub(crate) fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SeqGraphError::InvalidElement(ElementKind::Edge))
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.flags = flags::DELETED;
    }

    /// Records the incidence key of the signed `view`.
    pub(crate) fn set_incidence_seq(&mut self, view: EdgeId, key: SeqNum) {
        if view.is_normal() {
            self.alpha_seq = key;
        } else {
            self.omega_seq = key;
        }
    }
}
