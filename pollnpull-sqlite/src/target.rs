use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tokio_util::sync::CancellationToken;

use pollnpull_core::{AdapterError, DataTarget, Developer, PersistReport};

use crate::db::{open_store, open_store_in_memory};
use crate::error::StoreError;

const ADAPTER: &str = "sqlite";

const INSERT_DEVELOPER: &str = "INSERT INTO developers (id, full_name, organization, contact_handle) \
     VALUES (?1, ?2, ?3, ?4)";

/// Target adapter over one SQLite connection.
///
/// The connection is owned here and never handed to the engine. rusqlite is
/// blocking, so every call runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteTarget {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTarget {
    /// Wrap an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        open_store(path).map(Self::new)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        open_store_in_memory().map(Self::new)
    }

    /// All stored developers ordered by id.
    pub fn developers(&self) -> Result<Vec<Developer>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, full_name, organization, contact_handle FROM developers ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Developer {
                id: row.get(0)?,
                full_name: row.get(1)?,
                organization: row.get(2)?,
                contact_handle: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM developers", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, AdapterError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            work(&mut guard)
        })
        .await
        .map_err(|err| AdapterError::Join(err.to_string()))?
        .map_err(|err| AdapterError::store(ADAPTER, err))
    }
}

#[async_trait]
impl DataTarget for SqliteTarget {
    fn name(&self) -> &str {
        ADAPTER
    }

    async fn list_known_ids(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, AdapterError> {
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        self.blocking(|conn| list_ids(conn)).await
    }

    async fn persist(
        &self,
        records: &[Developer],
        cancel: &CancellationToken,
    ) -> Result<PersistReport, AdapterError> {
        if records.is_empty() {
            return Ok(PersistReport::default());
        }
        let records = records.to_vec();
        let cancel = cancel.clone();
        self.blocking(move |conn| persist_batch(conn, &records, &cancel))
            .await
    }
}

fn list_ids(conn: &Connection) -> Result<HashSet<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT id FROM developers")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

/// Insert the batch inside one transaction.
///
/// Cancellation is checked once, right after the transaction opens: if the
/// token is already signalled nothing is committed. A cancellation that
/// arrives later does not stop the commit of the rows that succeeded.
fn persist_batch(
    conn: &mut Connection,
    records: &[Developer],
    cancel: &CancellationToken,
) -> Result<PersistReport, StoreError> {
    let tx = conn.transaction()?;

    if cancel.is_cancelled() {
        tx.rollback()?;
        tracing::warn!(
            attempted = records.len(),
            "cancelled before batch began, transaction rolled back",
        );
        return Ok(PersistReport::rolled_back(records.len()));
    }

    let mut report = PersistReport {
        attempted: records.len(),
        ..PersistReport::default()
    };
    {
        let mut stmt = tx.prepare(INSERT_DEVELOPER)?;
        for dev in records {
            if let Err(err) = dev.validate() {
                tracing::warn!(record = ?dev, error = %err, "refusing invalid record (skipping)");
                report.failed += 1;
                continue;
            }
            match stmt.execute(params![
                dev.id,
                dev.full_name,
                dev.organization,
                dev.contact_handle
            ]) {
                Ok(_) => report.inserted += 1,
                Err(err) => {
                    tracing::warn!(id = %dev.id, error = %err, "insert failed (skipping)");
                    report.failed += 1;
                }
            }
        }
    }
    tx.commit()?;

    tracing::debug!(
        inserted = report.inserted,
        failed = report.failed,
        "batch committed",
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: &str, name: &str) -> Developer {
        Developer::new(id, name).expect("valid developer")
    }

    #[test]
    fn persist_batch_skips_invalid_literal_records() {
        let mut conn = open_store_in_memory().expect("open");
        let bad = Developer {
            id: String::new(),
            full_name: "Nobody".into(),
            organization: None,
            contact_handle: None,
        };
        let report =
            persist_batch(&mut conn, &[dev("a", "Ann"), bad], &CancellationToken::new())
                .expect("persist");
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(list_ids(&conn).expect("ids").len(), 1);
    }

    #[test]
    fn optional_fields_are_stored_as_null() {
        let mut conn = open_store_in_memory().expect("open");
        persist_batch(&mut conn, &[dev("a", "Ann")], &CancellationToken::new())
            .expect("persist");
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM developers WHERE organization IS NULL AND contact_handle IS NULL",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(nulls, 1);
    }
}
