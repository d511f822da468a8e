//! SQLite-backed [`DataTarget`](pollnpull_core::DataTarget).
//!
//! The store holds a single `developers` relation keyed by developer id.

pub mod db;
pub mod error;
mod target;

pub use db::{open_store, open_store_in_memory};
pub use error::StoreError;
pub use target::SqliteTarget;
