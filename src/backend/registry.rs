use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::info;

use super::{BackendResult, SqlBackend, SqliteBackend};
use crate::config::{BackendConfig, BackendKind};
use crate::types::BackendError;

/// Named backend connections owned by the application.
///
/// Graph databases receive a connection from the registry when they are
/// opened; the registry itself is never global.
#[derive(Default)]
pub struct BackendRegistry {
    connections: BTreeMap<String, Rc<dyn SqlBackend>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection described by `config` and registers it as `name`,
    /// replacing any previous connection of that name.
    pub fn open(&mut self, name: &str, config: &BackendConfig) -> BackendResult<Rc<dyn SqlBackend>> {
        let backend: Rc<dyn SqlBackend> = match config.kind {
            BackendKind::Sqlite => {
                let path = config
                    .path
                    .as_ref()
                    .ok_or_else(|| BackendError::Misconfigured("sqlite backend needs a path".into()))?;
                Rc::new(SqliteBackend::open(path, config.synchronous)?)
            }
            BackendKind::Memory => Rc::new(SqliteBackend::open_in_memory()?),
        };
        info!(connection = name, vendor = backend.vendor(), "backend connection opened");
        self.connections.insert(name.to_owned(), Rc::clone(&backend));
        Ok(backend)
    }

    /// Registers an already opened backend.
    pub fn register(&mut self, name: &str, backend: Rc<dyn SqlBackend>) {
        self.connections.insert(name.to_owned(), backend);
    }

    /// Connection registered as `name`.
    pub fn get(&self, name: &str) -> BackendResult<Rc<dyn SqlBackend>> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::UnknownConnection(name.to_owned()))
    }

    /// Drops the registry's handle on `name`. Databases already using it keep
    /// the connection alive.
    pub fn close(&mut self, name: &str) -> bool {
        self.connections.remove(name).is_some()
    }

    /// Registered connection names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }
}
