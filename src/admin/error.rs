use thiserror::Error;

use crate::config::ConfigError;
use crate::types::{BackendError, SeqGraphError};

/// Error type for administrative operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No graph with this name exists.
    #[error("graph not found: {0}")]
    MissingGraph(String),
    /// Custom error message.
    #[error("{0}")]
    Message(String),
    /// Core database error.
    #[error(transparent)]
    Core(#[from] SeqGraphError),
    /// Backend error outside of a graph operation.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for administrative operations.
pub type Result<T> = std::result::Result<T, AdminError>;

impl AdminError {
    /// Error for a graph name with no stored graph.
    pub fn missing_graph(name: impl Into<String>) -> Self {
        AdminError::MissingGraph(name.into())
    }
}
