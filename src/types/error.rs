use thiserror::Error;

use super::{ElementKind, ListKind, SeqNum};

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SeqGraphError>;

/// Crate-wide error type.
///
/// Invariant violations (membership, duplicate keys, incomplete
/// reorganization) are programmer errors and are never recovered internally.
/// Backend failures are wrapped in [`SeqGraphError::Persistence`]. Absent
/// elements are not errors; lookups return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum SeqGraphError {
    /// The element is not (or no longer) a member of the list.
    #[error("element {id} is not a member of the {list}")]
    NotMember {
        /// List the lookup was performed on.
        list: ListKind,
        /// Raw id of the element.
        id: i64,
    },
    /// Two members would share a sequence number.
    #[error("duplicate sequence number {0}")]
    DuplicateKey(SeqNum),
    /// `put_before`/`put_after` was asked to place an element next to itself.
    #[error("cannot place an element relative to itself")]
    SelfPlacement,
    /// Reorganization left entries without a new key.
    #[error("incomplete reorganization: {assigned} of {expected} entries renumbered")]
    IncompleteReorganization {
        /// Entries that received a new key.
        assigned: usize,
        /// Entries in the list before reorganizing.
        expected: usize,
    },
    /// The list holds too many members to fit between the borders.
    #[error("sequence space of the {0} is exhausted")]
    SequenceSpaceExhausted(ListKind),
    /// No more ids can be allocated.
    #[error("id space exhausted")]
    IdSpaceExhausted,
    /// The instance was deleted and can no longer be used.
    #[error("{0} instance has been deleted")]
    InvalidElement(ElementKind),
    /// Unknown schema type name.
    #[error("unknown {kind} type '{name}'")]
    UnknownType {
        /// Vertex or edge.
        kind: ElementKind,
        /// Requested name.
        name: String,
    },
    /// Unknown attribute for the element's type.
    #[error("type '{type_name}' has no attribute '{name}'")]
    UnknownAttribute {
        /// Owning type.
        type_name: String,
        /// Requested attribute.
        name: String,
    },
    /// The value does not belong to the attribute's domain.
    #[error("attribute '{name}' expects {expected}, got {actual}")]
    DomainMismatch {
        /// Attribute name.
        name: String,
        /// Domain of the attribute.
        expected: &'static str,
        /// Domain of the supplied value.
        actual: &'static str,
    },
    /// The element belongs to a different graph.
    #[error("element belongs to graph {actual}, not {expected}")]
    ForeignElement {
        /// Graph the operation ran on.
        expected: u32,
        /// Graph the element belongs to.
        actual: u32,
    },
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Backend failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] BackendError),
}

/// Failures reported by an SQL backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// SQLite driver error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Value encoding or decoding failed.
    #[error("attribute codec: {0}")]
    Codec(#[from] serde_json::Error),
    /// A row the caller relies on does not exist.
    #[error("missing {0} row")]
    MissingRow(&'static str),
    /// Stored data violates the layout the backend expects.
    #[error("corrupt backend data: {0}")]
    Corrupt(String),
    /// The connection settings cannot be used.
    #[error("invalid backend configuration: {0}")]
    Misconfigured(String),
    /// No connection registered under this name.
    #[error("no backend connection named '{0}'")]
    UnknownConnection(String),
}
