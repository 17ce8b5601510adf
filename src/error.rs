//! Error types for the SSH config engine.

use std::path::PathBuf;

/// Errors produced while reading, editing or saving an SSH config file.
///
/// Parsing itself never fails: anything the engine does not understand is kept
/// as opaque text. Only filesystem access and bad caller input are errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to {action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
