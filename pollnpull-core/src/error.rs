//! Error types for pollnpull-core.

use std::path::PathBuf;

use thiserror::Error;

/// A record that violates the developer invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDeveloper {
    #[error("developer id is empty")]
    MissingId,

    #[error("developer '{id}' has an empty full name")]
    MissingFullName { id: String },
}

/// Errors surfaced by a source or target adapter to the engine.
///
/// Row-level problems never show up here; adapters log and skip those.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Upstream retrieval failed as a whole (network, auth, API).
    #[error("{adapter}: retrieval failed: {message}")]
    Retrieval { adapter: String, message: String },

    /// The store could not be queried or a transaction could not be opened/committed.
    #[error("{adapter}: store error: {source}")]
    Store {
        adapter: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The call observed the cancellation token and gave up.
    #[error("operation cancelled")]
    Cancelled,

    /// A blocking worker panicked or was aborted.
    #[error("blocking task failed: {0}")]
    Join(String),
}

impl AdapterError {
    pub fn retrieval(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    pub fn store(
        adapter: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            adapter: adapter.into(),
            source: Box::new(source),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Startup configuration failures. These never reach the engine.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source identifier is required and must not be empty")]
    MissingSourceIdentifier,

    #[error("credentials file is required")]
    MissingCredentials,

    #[error("unable to read credentials at {path}: {source}")]
    CredentialsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
