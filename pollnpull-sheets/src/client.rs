//! Blocking client for the Sheets v4 `spreadsheets.values.get` endpoint.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::auth::{ServiceAccountKey, TokenProvider};
use crate::error::SheetsError;

pub const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body of `values.get`. Empty trailing cells and rows are omitted
/// by the API, so rows may be shorter than the requested range.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
    agent: ureq::Agent,
    tokens: TokenProvider,
    endpoint: String,
}

impl SheetsClient {
    /// Build a client from a service-account JSON key.
    pub fn from_credentials(credentials: &[u8]) -> Result<Self, SheetsError> {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let key = ServiceAccountKey::from_json(credentials)?;
        let tokens = TokenProvider::new(key, agent.clone())?;
        Ok(Self {
            agent,
            tokens,
            endpoint: SHEETS_ENDPOINT.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, emulators).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.endpoint,
            spreadsheet_id,
            encode_range(range)
        )
    }

    /// Fetch the raw rows of `range`. Blocking.
    pub fn fetch_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<Value>>, SheetsError> {
        let token = self.tokens.access_token()?;
        let url = self.values_url(spreadsheet_id, range);

        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {token}"))
            .query("majorDimension", "ROWS")
            .call()
            .map_err(|err| SheetsError::from_ureq(&url, err))?;
        let body: ValueRange = response
            .into_json()
            .map_err(|source| SheetsError::Decode {
                url: url.clone(),
                source,
            })?;

        tracing::debug!(
            spreadsheet_id,
            range = body.range.as_deref().unwrap_or(range),
            rows = body.values.len(),
            "fetched sheet values",
        );
        Ok(body.values)
    }
}

/// Percent-encode the characters of an A1/R1C1 range that are not valid in a
/// URL path segment. Sheet names may contain spaces and other punctuation.
///
/// Unreserved characters pass through, and so do `!` and `:`: both are legal
/// in a path segment and the API expects them literally as the sheet and
/// cell separators. Everything else, `/` and `'` included, is escaped.
fn encode_range(range: &str) -> String {
    let mut out = String::with_capacity(range.len());
    for byte in range.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'!' | b':' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
