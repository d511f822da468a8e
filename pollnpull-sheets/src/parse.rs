//! Sheet row → [`Developer`].

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use pollnpull_core::{Developer, InvalidDeveloper};

/// Replaceable row parser used by [`SheetsSource`](crate::SheetsSource).
pub type RowParser = Arc<dyn Fn(&[Value]) -> Result<Developer, RowError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("row has invalid or missing data: {0}")]
    Invalid(#[from] InvalidDeveloper),

    #[error("{0}")]
    Custom(String),
}

/// Default layout: id, full name, organization, contact handle.
///
/// Non-string cells count as empty. Values are trimmed.
pub fn parse_row(row: &[Value]) -> Result<Developer, RowError> {
    let cell = |index: usize| row.get(index).and_then(Value::as_str).unwrap_or_default();

    Ok(Developer::new(cell(0), cell(1))?
        .with_organization(cell(2))
        .with_contact_handle(cell(3)))
}

pub(crate) fn default_parser() -> RowParser {
    Arc::new(parse_row)
}
