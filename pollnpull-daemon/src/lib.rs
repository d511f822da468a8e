//! Synchronization engine: poll loop, cancellation and process runtime.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{
    cycle_once, init_tracing, run, run_once, spawn_interrupt_watcher, start_blocking,
    sync_blocking, Engine, EngineState, RunReport, SyncOutcome,
};
