//! SQLite connection bootstrap and schema migration.

pub mod migrations;
mod open;

pub use open::{open_store, open_store_in_memory};
