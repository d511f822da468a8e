use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::Connection;

use super::migrations::apply_migrations;
use crate::error::StoreError;

/// Open (or create) the store file and bring its schema up to date.
pub fn open_store(path: impl AsRef<Path>) -> Result<Connection, StoreError> {
    let path = path.as_ref();
    let started_at = Instant::now();

    let conn = Connection::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let conn = bootstrap(conn).inspect_err(|err| {
        tracing::error!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            error = %err,
            "store bootstrap failed",
        );
    })?;

    tracing::info!(
        path = %path.display(),
        duration_ms = started_at.elapsed().as_millis() as u64,
        "store opened",
    );
    Ok(conn)
}

/// In-memory store with the schema applied.
pub fn open_store_in_memory() -> Result<Connection, StoreError> {
    bootstrap(Connection::open_in_memory()?)
}

fn bootstrap(mut conn: Connection) -> Result<Connection, StoreError> {
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
