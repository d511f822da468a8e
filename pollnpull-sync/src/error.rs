//! Error types for pollnpull-sync.

use thiserror::Error;

use pollnpull_core::AdapterError;

/// A failed cycle step. Each variant names the adapter that failed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("listing known ids from {adapter} failed: {source}")]
    List {
        adapter: String,
        #[source]
        source: AdapterError,
    },

    #[error("computing delta from {adapter} failed: {source}")]
    Delta {
        adapter: String,
        #[source]
        source: AdapterError,
    },

    #[error("persisting to {adapter} failed: {source}")]
    Persist {
        adapter: String,
        #[source]
        source: AdapterError,
    },
}

impl SyncError {
    pub fn adapter_error(&self) -> &AdapterError {
        match self {
            Self::List { source, .. } | Self::Delta { source, .. } | Self::Persist { source, .. } => {
                source
            }
        }
    }

    /// True when the failing step gave up because the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.adapter_error().is_cancelled()
    }
}
