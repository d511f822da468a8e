//! Collaborator contracts consumed by the synchronization engine.
//!
//! Every I/O-bound call receives the run's [`CancellationToken`]. Adapters are
//! expected to observe it at their own I/O boundaries and return
//! [`AdapterError::Cancelled`] promptly; the engine never interrupts them.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;
use crate::types::Developer;

/// Upstream record set.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Return the valid upstream records whose id is not in `existing`.
    ///
    /// Malformed rows are logged and skipped. Only a systemic retrieval
    /// failure fails the call. No ordering guarantee.
    async fn delta(
        &self,
        existing: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Developer>, AdapterError>;
}

/// Durable store of already-ingested records.
#[async_trait]
pub trait DataTarget: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Every id currently durable in the store.
    async fn list_known_ids(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, AdapterError>;

    /// Persist a batch inside one transaction.
    ///
    /// A failing row is logged and skipped without aborting the batch. The
    /// transaction is rolled back only when `cancel` is already signalled
    /// as it begins; otherwise it commits whatever rows succeeded.
    async fn persist(
        &self,
        records: &[Developer],
        cancel: &CancellationToken,
    ) -> Result<PersistReport, AdapterError>;
}

/// Outcome of a single [`DataTarget::persist`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
    pub rolled_back: bool,
}

impl PersistReport {
    pub fn rolled_back(attempted: usize) -> Self {
        Self {
            attempted,
            inserted: 0,
            failed: 0,
            rolled_back: true,
        }
    }
}
