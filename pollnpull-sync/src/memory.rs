//! In-memory source and target.
//!
//! Both honour the cancellation token and the persist contract of the real
//! adapters, and expose knobs for failure injection. Used by the engine's
//! tests and handy for wiring checks without external services.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use pollnpull_core::{compute_delta, AdapterError, DataSource, DataTarget, Developer, PersistReport};

/// Upstream rows held in memory. Rows may be invalid on purpose.
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: Mutex<Vec<Developer>>,
    latency: Mutex<Option<Duration>>,
    fail: AtomicBool,
    delta_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(rows: Vec<Developer>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Replace the upstream rows seen by later cycles.
    pub fn set_rows(&self, rows: Vec<Developer>) {
        *self.rows.lock() = rows;
    }

    /// Make every `delta` call take this long (cancellable).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn fail_retrieval(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delta_calls(&self) -> usize {
        self.delta_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &str {
        "memory-source"
    }

    async fn delta(
        &self,
        existing: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Developer>, AdapterError> {
        self.delta_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AdapterError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AdapterError::retrieval(self.name(), "upstream unavailable"));
        }

        let rows = self.rows.lock().clone();
        Ok(compute_delta(rows, existing))
    }
}

/// A store keyed by developer id.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    rows: Mutex<BTreeMap<String, Developer>>,
    rejected: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    list_calls: AtomicUsize,
    persist_calls: AtomicUsize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds minimal records for `ids`.
    pub fn with_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let target = Self::new();
        {
            let mut rows = target.rows.lock();
            for id in ids {
                rows.insert(
                    id.to_string(),
                    Developer {
                        id: id.to_string(),
                        full_name: id.to_string(),
                        organization: None,
                        contact_handle: None,
                    },
                );
            }
        }
        target
    }

    /// Simulate a per-row insert failure (e.g. a constraint violation) for `id`.
    pub fn reject_id(&self, id: impl Into<String>) {
        self.rejected.lock().insert(id.into());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows.lock().keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Developer> {
        self.rows.lock().get(id).cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataTarget for MemoryTarget {
    fn name(&self) -> &str {
        "memory-target"
    }

    async fn list_known_ids(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, AdapterError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AdapterError::retrieval(self.name(), "store unreachable"));
        }
        Ok(self.rows.lock().keys().cloned().collect())
    }

    async fn persist(
        &self,
        records: &[Developer],
        cancel: &CancellationToken,
    ) -> Result<PersistReport, AdapterError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Ok(PersistReport::rolled_back(records.len()));
        }

        // Stage the batch, then apply it in one step like a commit.
        let rejected = self.rejected.lock().clone();
        let mut rows = self.rows.lock();
        let mut staged = BTreeMap::new();
        let mut report = PersistReport {
            attempted: records.len(),
            ..PersistReport::default()
        };

        for dev in records {
            let duplicate = rows.contains_key(&dev.id) || staged.contains_key(&dev.id);
            if duplicate || rejected.contains(&dev.id) || !dev.is_valid() {
                tracing::warn!(id = %dev.id, "insert failed, skipping row");
                report.failed += 1;
                continue;
            }
            staged.insert(dev.id.clone(), dev.clone());
            report.inserted += 1;
        }
        rows.extend(staged);
        Ok(report)
    }
}
