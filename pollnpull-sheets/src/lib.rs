//! Google Sheets [`DataSource`](pollnpull_core::DataSource).
//!
//! Reads a fixed range of a spreadsheet through the Sheets v4 values API,
//! authenticating as a service account. Columns are, in order: id, full
//! name, organization, contact handle.

pub mod auth;
pub mod client;
pub mod error;
pub mod parse;
mod source;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use client::{SheetsClient, ValueRange};
pub use error::SheetsError;
pub use parse::{parse_row, RowError, RowParser};
pub use source::{rows_to_delta, SheetsSource};
