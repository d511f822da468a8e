//! The list → delta → persist cycle shared by the CLI and the daemon.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use pollnpull_core::{DataSource, DataTarget, PersistReport};

use crate::error::SyncError;

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Ids the target reported before the cycle.
    pub known: usize,
    /// Records the source returned as new.
    pub fetched: usize,
    /// Records committed by the target.
    pub persisted: usize,
    /// Rows the target skipped after a per-row insert failure.
    pub failed: usize,
    /// The batch transaction was rolled back because the run was cancelled.
    pub rolled_back: bool,
    pub duration_ms: u64,
}

/// Run a single synchronization cycle.
///
/// The three adapter calls run strictly in sequence; the first error aborts
/// the cycle. An empty delta skips `persist` entirely.
pub async fn sync_once(
    source: &dyn DataSource,
    target: &dyn DataTarget,
    cancel: &CancellationToken,
) -> Result<CycleSummary, SyncError> {
    let started = Instant::now();

    let known = target
        .list_known_ids(cancel)
        .await
        .map_err(|source| SyncError::List {
            adapter: target.name().to_string(),
            source,
        })?;
    tracing::debug!(target_name = target.name(), known = known.len(), "listed known ids");

    let delta = source
        .delta(&known, cancel)
        .await
        .map_err(|err| SyncError::Delta {
            adapter: source.name().to_string(),
            source: err,
        })?;
    tracing::debug!(source_name = source.name(), fetched = delta.len(), "computed delta");

    let report = if delta.is_empty() {
        PersistReport::default()
    } else {
        target
            .persist(&delta, cancel)
            .await
            .map_err(|source| SyncError::Persist {
                adapter: target.name().to_string(),
                source,
            })?
    };

    let summary = summarize(known.len(), delta.len(), &report, started.elapsed());
    tracing::info!(
        persisted = summary.persisted,
        failed = summary.failed,
        known = summary.known,
        rolled_back = summary.rolled_back,
        duration_ms = summary.duration_ms,
        "{} new developers are persisted to the target",
        summary.persisted,
    );
    Ok(summary)
}

fn summarize(known: usize, fetched: usize, report: &PersistReport, elapsed: Duration) -> CycleSummary {
    CycleSummary {
        known,
        fetched,
        persisted: report.inserted,
        failed: report.failed,
        rolled_back: report.rolled_back,
        duration_ms: elapsed.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySource, MemoryTarget};
    use pollnpull_core::Developer;

    fn dev(id: &str, name: &str) -> Developer {
        Developer {
            id: id.into(),
            full_name: name.into(),
            organization: None,
            contact_handle: None,
        }
    }

    #[tokio::test]
    async fn empty_delta_skips_persist() {
        let source = MemorySource::new(vec![dev("a", "Ann")]);
        let target = MemoryTarget::with_ids(["a"]);
        let summary = sync_once(&source, &target, &CancellationToken::new())
            .await
            .expect("cycle");
        assert_eq!(summary.known, 1);
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.persisted, 0);
        assert_eq!(target.persist_calls(), 0);
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_delta() {
        let source = MemorySource::new(vec![dev("a", "Ann")]);
        let target = MemoryTarget::new();
        target.fail_listing(true);

        let err = sync_once(&source, &target, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::List { .. }), "got: {err}");
        assert_eq!(source.delta_calls(), 0);
        assert_eq!(target.persist_calls(), 0);
    }

    #[tokio::test]
    async fn delta_failure_names_the_source() {
        let source = MemorySource::new(vec![]);
        source.fail_retrieval(true);
        let target = MemoryTarget::new();

        let err = sync_once(&source, &target, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Delta { .. }), "got: {err}");
        assert!(err.to_string().contains("memory-source"));
    }
}
