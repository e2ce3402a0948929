#![forbid(unsafe_code)]

//! Identifiers, sequence keys and the crate-wide error type.

mod error;

use std::fmt;

use serde::Serialize;

pub use error::{BackendError, Result, SeqGraphError};

/// Sparse 64-bit key imposing a total order on the members of one list.
pub type SeqNum = i64;

/// Identifier of a graph stored in a backend.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct GraphId(pub u32);

/// Identifier of a vertex, unique within its graph. Zero is the placeholder
/// carried by an instance that has not been assigned an id yet.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct VertexId(pub u32);

/// Signed edge identifier.
///
/// A positive value names the edge in its normal direction (seen from its
/// start vertex), the negated value names the reversed view of the same edge
/// (seen from its end vertex).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct EdgeId(pub i32);

/// Stored integer id of a vertex or edge type.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct TypeId(pub u32);

/// Stored integer id of an attribute of one element type.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct AttrId(pub u32);

impl VertexId {
    /// Placeholder id of a vertex that is not part of a graph yet.
    pub const UNASSIGNED: VertexId = VertexId(0);

    /// Index of the vertex in its graph's id pool.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl EdgeId {
    /// Placeholder id of an edge that is not part of a graph yet.
    pub const UNASSIGNED: EdgeId = EdgeId(0);

    /// Builds the normal-direction id for pool index `index`.
    pub fn from_index(index: u32) -> Result<Self> {
        i32::try_from(index)
            .map(EdgeId)
            .map_err(|_| SeqGraphError::IdSpaceExhausted)
    }

    /// Returns `true` for the normal (start-vertex) view.
    pub fn is_normal(self) -> bool {
        self.0 > 0
    }

    /// The normal-direction id of this edge.
    pub fn normal(self) -> EdgeId {
        EdgeId(self.0.abs())
    }

    /// The reversed-direction id of this edge.
    pub fn reversed(self) -> EdgeId {
        EdgeId(-self.0)
    }

    /// Index of the edge in its graph's id pool, independent of direction.
    pub fn index(self) -> u32 {
        self.0.unsigned_abs()
    }
}

impl From<VertexId> for i64 {
    fn from(value: VertexId) -> Self {
        i64::from(value.0)
    }
}

impl From<EdgeId> for i64 {
    fn from(value: EdgeId) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three kinds of sequenced lists a graph maintains.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Global vertex order (VSeq).
    Vertex,
    /// Global edge order (ESeq), normal edge ids only.
    Edge,
    /// A vertex's local incidence order (LambdaSeq), signed edge ids.
    Incidence,
}

impl ListKind {
    /// Short lowercase name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Vertex => "vertex list",
            ListKind::Edge => "edge list",
            ListKind::Incidence => "incidence list",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a schema type describes vertices or edges.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Vertex type.
    Vertex,
    /// Edge type.
    Edge,
}

impl ElementKind {
    /// Stable tag stored by backends.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Vertex => "V",
            ElementKind::Edge => "E",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => f.write_str("vertex"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}
