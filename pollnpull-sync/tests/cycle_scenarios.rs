use std::collections::HashSet;

use pollnpull_core::{CancellationToken, DataTarget, Developer};
use pollnpull_sync::{
    memory::{MemorySource, MemoryTarget},
    sync_once, SyncError,
};

fn dev(id: &str, name: &str) -> Developer {
    Developer {
        id: id.into(),
        full_name: name.into(),
        organization: None,
        contact_handle: None,
    }
}

#[tokio::test]
async fn two_cycles_over_static_upstream() {
    let source = MemorySource::new(vec![dev("a", "Ann"), dev("", "Bad"), dev("b", "Bob")]);
    let target = MemoryTarget::new();
    let cancel = CancellationToken::new();

    let first = sync_once(&source, &target, &cancel).await.expect("first cycle");
    assert_eq!(first.known, 0);
    assert_eq!(first.fetched, 2, "the empty-id row is dropped");
    assert_eq!(first.persisted, 2);
    assert_eq!(target.ids(), ["a", "b"]);

    let second = sync_once(&source, &target, &cancel).await.expect("second cycle");
    assert_eq!(second.known, 2);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.persisted, 0);
    assert_eq!(target.persist_calls(), 1, "persist([]) is a no-op");
}

#[tokio::test]
async fn store_ids_match_unique_valid_upstream_ids() {
    let source = MemorySource::new(vec![dev("a", "Ann")]);
    let target = MemoryTarget::new();
    let cancel = CancellationToken::new();

    let upstream_rounds = [
        vec![dev("a", "Ann")],
        vec![dev("a", "Ann"), dev("b", "Bob"), dev("b", "Bobby")],
        vec![dev("c", ""), dev("b", "Bob"), dev("d", "Dee")],
        vec![dev("a", "Ann"), dev("d", "Dee")],
    ];

    let mut seen = HashSet::new();
    for rows in upstream_rounds {
        seen.extend(rows.iter().filter(|d| d.is_valid()).map(|d| d.id.clone()));
        source.set_rows(rows);
        sync_once(&source, &target, &cancel).await.expect("cycle");
    }

    let stored: HashSet<String> = target.ids().into_iter().collect();
    assert_eq!(stored, seen);
    assert_eq!(target.ids().len(), stored.len(), "no id stored twice");
    assert_eq!(target.get("b").expect("b").full_name, "Bob");
}

#[tokio::test]
async fn failing_row_does_not_abort_batch() {
    let rows: Vec<_> = (1..=5).map(|i| dev(&format!("r{i}"), "Row")).collect();
    let source = MemorySource::new(rows);
    let target = MemoryTarget::new();
    target.reject_id("r3");

    let summary = sync_once(&source, &target, &CancellationToken::new())
        .await
        .expect("cycle");
    assert_eq!(summary.persisted, 4);
    assert_eq!(summary.failed, 1);

    let known = target
        .list_known_ids(&CancellationToken::new())
        .await
        .expect("list");
    for id in ["r1", "r2", "r4", "r5"] {
        assert!(known.contains(id), "{id} should be committed");
    }
    assert!(!known.contains("r3"));
}

#[tokio::test]
async fn cancelled_persist_commits_nothing() {
    let target = MemoryTarget::with_ids(["a"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = target
        .persist(&[dev("b", "Bob"), dev("c", "Cy")], &cancel)
        .await
        .expect("persist");
    assert!(report.rolled_back);
    assert_eq!(report.inserted, 0);
    assert_eq!(target.ids(), ["a"]);
}

#[tokio::test]
async fn cancelled_cycle_reports_cancellation() {
    let source = MemorySource::new(vec![dev("a", "Ann")]);
    let target = MemoryTarget::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = sync_once(&source, &target, &cancel).await.unwrap_err();
    assert!(matches!(err, SyncError::List { .. }), "got: {err}");
    assert!(err.is_cancelled());
    assert!(target.ids().is_empty());
}
