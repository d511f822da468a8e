use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the engine and the process runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sync error: {0}")]
    Sync(#[from] pollnpull_sync::SyncError),

    #[error("store error: {0}")]
    Store(#[from] pollnpull_sqlite::StoreError),

    #[error("source error: {0}")]
    Sheets(#[from] pollnpull_sheets::SheetsError),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine has stopped and cannot be restarted")]
    AlreadyStopped,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
