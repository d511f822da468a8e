use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use pollnpull_core::{compute_delta, AdapterError, Config, DataSource, Developer};

use crate::client::SheetsClient;
use crate::error::SheetsError;
use crate::parse::{default_parser, RowError, RowParser};

const ADAPTER: &str = "google-sheets";

/// Source adapter reading one spreadsheet range.
pub struct SheetsSource {
    client: Arc<SheetsClient>,
    spreadsheet_id: String,
    range: String,
    parser: RowParser,
}

impl SheetsSource {
    pub fn new(
        client: SheetsClient,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            parser: default_parser(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SheetsError> {
        let client = SheetsClient::from_credentials(config.credentials.as_bytes())?;
        Ok(Self::new(
            client,
            &config.source_identifier,
            &config.sheet_range,
        ))
    }

    /// Swap the row parser, e.g. for a sheet with a different column order.
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Developer, RowError> + Send + Sync + 'static,
    {
        self.parser = Arc::new(parser);
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }
}

#[async_trait]
impl DataSource for SheetsSource {
    fn name(&self) -> &str {
        ADAPTER
    }

    async fn delta(
        &self,
        existing: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Developer>, AdapterError> {
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }

        let client = Arc::clone(&self.client);
        let spreadsheet_id = self.spreadsheet_id.clone();
        let range = self.range.clone();
        let fetch =
            tokio::task::spawn_blocking(move || client.fetch_rows(&spreadsheet_id, &range));

        // The blocking request cannot be interrupted; on cancel it is left to
        // finish on its own and its result is dropped.
        let rows = tokio::select! {
            _ = cancel.cancelled() => return Err(AdapterError::Cancelled),
            joined = fetch => joined
                .map_err(|err| AdapterError::Join(err.to_string()))?
                .map_err(|err| {
                    AdapterError::retrieval(
                        ADAPTER,
                        format!(
                            "can not retrieve spreadsheet values for '{}': {err}",
                            self.spreadsheet_id
                        ),
                    )
                })?,
        };

        Ok(rows_to_delta(&rows, existing, self.parser.as_ref()))
    }
}

/// Parse raw rows and keep the ones not already known.
///
/// Rows that fail to parse are logged with their content and skipped.
pub fn rows_to_delta(
    rows: &[Vec<Value>],
    existing: &HashSet<String>,
    parser: &(dyn Fn(&[Value]) -> Result<Developer, RowError> + Send + Sync),
) -> Vec<Developer> {
    let parsed = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| match parser(row) {
            Ok(dev) => Some(dev),
            Err(err) => {
                tracing::warn!(row = index + 1, cells = ?row, error = %err, "can not parse row (skipping)");
                None
            }
        });
    compute_delta(parsed, existing)
}
