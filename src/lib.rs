//! Ordered graph storage over an SQL backend.
//!
//! Vertices, edges and each vertex's incidences are kept in sequenced lists
//! with sparse 64-bit keys, so reordering never renumbers rows unless a gap
//! runs out. Changes are written through a [`backend::SqlBackend`] as they
//! happen, and loaded elements are shared through a reclaimable cache.

#![warn(missing_docs)]

pub mod admin;
pub mod backend;
pub mod config;
pub mod primitives;
pub mod schema;
pub mod storage;
pub mod types;

pub use backend::{BackendRegistry, SqlBackend, SqliteBackend};
pub use config::{BackendConfig, BackendKind, SeqGraphConfig};
pub use schema::{AttrDef, AttrDomain, AttrValue, Schema};
pub use storage::{Direction, Graph, GraphDatabase, GraphDbOptions, VersionWriteBack};
pub use types::{EdgeId, GraphId, Result, SeqGraphError, VertexId};
