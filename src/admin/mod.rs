#![forbid(unsafe_code)]

//! Graph administration utilities.
//!
//! Integrity verification and statistics reporting for open graphs, used by
//! the `seqgraph` binary and available to applications.

mod error;
mod stats;
mod verify;

/// Error types for administrative operations.
pub use error::{AdminError, Result};

/// Statistics collection and reporting.
///
/// Reports element counts, versions, key spacing of the global lists, id
/// pool usage and cache counters.
pub use stats::{
    stats, BackendStatsSection, CacheStatsSection, GraphStatsSection, IdPoolSection,
    ListStatsSection, StatsReport,
};

/// Graph integrity verification.
///
/// Cross-checks in-memory lists against the rows stored in the backend.
pub use verify::{verify, VerifyCounts, VerifyFinding, VerifyLevel, VerifySeverity, VerifyReport};
