//! pollnpull core library — developer records, collaborator contracts, configuration.
//!
//! - [`types`] — the [`Developer`] record and its validation
//! - [`delta`] — identifier exclusion between upstream rows and the store
//! - [`adapter`] — [`DataSource`] / [`DataTarget`] traits consumed by the engine
//! - [`config`] — immutable runtime [`Config`]
//! - [`error`] — error enums shared by every crate

pub mod adapter;
pub mod config;
pub mod delta;
pub mod error;
pub mod types;

pub use adapter::{DataSource, DataTarget, PersistReport};
pub use config::{Config, ConfigFile, Credentials};
pub use delta::compute_delta;
pub use error::{AdapterError, ConfigError, InvalidDeveloper};
pub use tokio_util::sync::CancellationToken;
pub use types::Developer;
