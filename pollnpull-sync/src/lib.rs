//! # pollnpull-sync
//!
//! One synchronization cycle: list the ids the target already holds, ask the
//! source for the delta against them, persist that delta.
//!
//! Call [`sync_once`] for a single cycle. The poll loop that repeats it lives
//! in `pollnpull-daemon`.

pub mod error;
pub mod memory;
pub mod pipeline;

pub use error::SyncError;
pub use pipeline::{sync_once, CycleSummary};
