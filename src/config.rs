//! TOML configuration for backends and graph databases.
//!
//! ```toml
//! [backend]
//! kind = "sqlite"
//! path = "graphs.db"
//! synchronous = "normal"
//!
//! [graph]
//! vertex_cache_capacity = 4096
//! version_write_back = "on_flush"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::SyncMode;
use crate::storage::GraphDbOptions;

/// Backend vendor selected at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// Private in-memory SQLite database.
    Memory,
}

/// Connection settings for one backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Vendor.
    pub kind: BackendKind,
    /// Database file; required for [`BackendKind::Sqlite`].
    pub path: Option<PathBuf>,
    /// SQLite `synchronous` setting.
    pub synchronous: SyncMode,
}

impl BackendConfig {
    /// SQLite database at `path`.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: BackendKind::Sqlite,
            path: Some(path.into()),
            synchronous: SyncMode::default(),
        }
    }

    /// In-memory database.
    pub fn memory() -> Self {
        Self {
            kind: BackendKind::Memory,
            ..Self::default()
        }
    }
}

/// Top-level configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeqGraphConfig {
    /// Backend connection.
    pub backend: BackendConfig,
    /// Graph database options.
    pub graph: GraphDbOptions,
}

impl SeqGraphConfig {
    /// Loads `explicit`, or the default config file if it exists, or the
    /// built-in defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => read_file(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses configuration text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

fn read_file(path: &Path) -> Result<SeqGraphConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`SeqGraphConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// `<config dir>/seqgraph/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("seqgraph").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::VersionWriteBack;

    #[test]
    fn parses_backend_and_graph_sections() {
        let config = SeqGraphConfig::from_toml(
            r#"
            [backend]
            kind = "sqlite"
            path = "/tmp/g.db"
            synchronous = "full"

            [graph]
            vertex_cache_capacity = 16
            version_write_back = "write_through"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.backend, BackendConfig {
            kind: BackendKind::Sqlite,
            path: Some(PathBuf::from("/tmp/g.db")),
            synchronous: SyncMode::Full,
        });
        assert_eq!(config.graph.vertex_cache_capacity, 16);
        assert_eq!(config.graph.version_write_back, VersionWriteBack::WriteThrough);
        assert_eq!(
            config.graph.edge_cache_capacity,
            GraphDbOptions::default().edge_cache_capacity
        );
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let err = SeqGraphConfig::load(Some(PathBuf::from("/nonexistent/seqgraph.toml")))
            .expect_err("file does not exist");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[backend]\nkind = 3\n").expect("write");
        assert!(matches!(
            SeqGraphConfig::load(Some(path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
