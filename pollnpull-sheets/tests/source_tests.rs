use std::collections::HashSet;

use pollnpull_core::{CancellationToken, DataSource, Developer};
use pollnpull_sheets::{parse_row, rows_to_delta, RowError, SheetsClient, SheetsSource};
use serde_json::{json, Value};

const KEY_JSON: &str = include_str!("fixtures/service_account.json");

fn rows(value: Value) -> Vec<Vec<Value>> {
    serde_json::from_value(value).expect("rows")
}

fn ids(devs: &[Developer]) -> Vec<&str> {
    devs.iter().map(|d| d.id.as_str()).collect()
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let upstream = rows(json!([
        ["a", "Ann"],
        ["", "Bad"],
        ["b", "Bob", "Acme"],
        [17, "Numeric id"],
        []
    ]));
    let delta = rows_to_delta(&upstream, &HashSet::new(), &parse_row);
    assert_eq!(ids(&delta), ["a", "b"]);
    assert_eq!(delta[1].organization.as_deref(), Some("Acme"));
}

#[test]
fn known_ids_are_excluded() {
    let upstream = rows(json!([["a", "Ann"], ["b", "Bob"], ["c", "Cy"]]));
    let existing: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
    let delta = rows_to_delta(&upstream, &existing, &parse_row);
    assert_eq!(ids(&delta), ["b"]);
}

#[test]
fn custom_parser_reorders_columns() {
    let upstream = rows(json!([["Ann", "a"], ["Bob", "b"]]));
    let swapped = |row: &[Value]| -> Result<Developer, RowError> {
        let cell = |i: usize| row.get(i).and_then(Value::as_str).unwrap_or_default();
        Ok(Developer::new(cell(1), cell(0))?)
    };
    let delta = rows_to_delta(&upstream, &HashSet::new(), &swapped);
    assert_eq!(ids(&delta), ["a", "b"]);
    assert_eq!(delta[0].full_name, "Ann");
}

#[tokio::test]
async fn cancelled_delta_returns_without_network() {
    let client = SheetsClient::from_credentials(KEY_JSON.as_bytes())
        .expect("client")
        .with_endpoint("http://127.0.0.1:9");
    let source = SheetsSource::new(client, "sheet-id", "Sheet1!R2C1:C4")
        .with_parser(|row: &[Value]| parse_row(row));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = source
        .delta(&HashSet::new(), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled(), "got: {err}");
}
