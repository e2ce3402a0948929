//! Low-level building blocks shared by the storage layer.

/// Free-index pool used to allocate vertex and edge ids.
pub mod free_index;

pub use free_index::FreeIndexPool;
