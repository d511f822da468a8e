use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use pollnpull_core::{Config, DataSource, DataTarget};
use pollnpull_sheets::SheetsSource;
use pollnpull_sqlite::SqliteTarget;
use pollnpull_sync::{sync_once, CycleSummary};

use crate::error::{io_err, DaemonError};

/// Lifecycle of an [`Engine`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Syncing,
    Waiting,
    Stopped,
}

/// Totals for a run that ended by cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// Cycles that ran to completion.
    pub cycles: u64,
    pub persisted: usize,
    pub failed_rows: usize,
    pub last_cycle: Option<CycleSummary>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            cycles: 0,
            persisted: 0,
            failed_rows: 0,
            last_cycle: None,
        }
    }

    fn record(&mut self, summary: CycleSummary) {
        self.cycles += 1;
        self.persisted += summary.persisted;
        self.failed_rows += summary.failed;
        self.last_cycle = Some(summary);
    }
}

enum Next {
    Wait,
    Stop,
}

/// Polls `source` and persists its delta into `target` on a fixed interval.
///
/// One cycle runs at a time: the next wait starts only after the previous
/// cycle, including its persist, has fully returned.
pub struct Engine {
    source: Arc<dyn DataSource>,
    target: Arc<dyn DataTarget>,
    poll_interval: Duration,
    state: watch::Sender<EngineState>,
}

impl Engine {
    pub fn new(
        source: Arc<dyn DataSource>,
        target: Arc<dyn DataTarget>,
        poll_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            source,
            target,
            poll_interval,
            state,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Run one cycle immediately, then one per `poll_interval` tick until
    /// `cancel` fires.
    ///
    /// Returns `Ok` only for the cancellation outcome. A cycle error that is
    /// not caused by cancellation stops the run and is returned as is; there
    /// is no retry at this level.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, DaemonError> {
        self.claim()?;
        tracing::info!(
            source_name = self.source.name(),
            target_name = self.target.name(),
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            "sync engine started",
        );

        let mut report = RunReport::new();
        if let Next::Stop = self.cycle(&cancel, &mut report).await? {
            return Ok(report);
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // first tick completes immediately

        loop {
            self.transition(EngineState::Waiting);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(cycles = report.cycles, "cancelled while waiting, sync engine stopped");
                    self.transition(EngineState::Stopped);
                    return Ok(report);
                }
                _ = ticker.tick() => {}
            }

            if let Next::Stop = self.cycle(&cancel, &mut report).await? {
                return Ok(report);
            }
        }
    }

    async fn cycle(
        &self,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<Next, DaemonError> {
        self.transition(EngineState::Syncing);

        match sync_once(self.source.as_ref(), self.target.as_ref(), cancel).await {
            Ok(summary) => {
                report.record(summary);
                if cancel.is_cancelled() {
                    tracing::info!(cycles = report.cycles, "cancelled during cycle, sync engine stopped");
                    self.transition(EngineState::Stopped);
                    return Ok(Next::Stop);
                }
                Ok(Next::Wait)
            }
            Err(err) if cancel.is_cancelled() => {
                tracing::info!(error = %err, "cycle interrupted by cancellation, sync engine stopped");
                self.transition(EngineState::Stopped);
                Ok(Next::Stop)
            }
            Err(err) => {
                tracing::error!(error = %err, "sync cycle failed, stopping engine");
                self.transition(EngineState::Stopped);
                Err(err.into())
            }
        }
    }

    /// Idle → Syncing, atomically, so a shared engine never runs twice.
    fn claim(&self) -> Result<(), DaemonError> {
        let mut prior = EngineState::Idle;
        let claimed = self.state.send_if_modified(|state| {
            prior = *state;
            if *state == EngineState::Idle {
                *state = EngineState::Syncing;
                true
            } else {
                false
            }
        });
        match (claimed, prior) {
            (true, _) => Ok(()),
            (false, EngineState::Stopped) => Err(DaemonError::AlreadyStopped),
            (false, _) => Err(DaemonError::AlreadyRunning),
        }
    }

    fn transition(&self, next: EngineState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "engine state");
        }
    }
}

/// Cancel `cancel` on the first operator interrupt (ctrl-c, or SIGTERM on
/// unix). The task also ends once `cancel` fires for any other reason.
pub fn spawn_interrupt_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = interrupt() => match signal {
                Ok(name) => {
                    tracing::info!(signal = name, "received interrupt, shutting down");
                    cancel.cancel();
                }
                Err(err) => tracing::error!(error = %err, "interrupt handler failed"),
            }
        }
    })
}

#[cfg(unix)]
async fn interrupt() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn interrupt() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

fn open_adapters(config: &Config) -> Result<(Arc<SheetsSource>, Arc<SqliteTarget>), DaemonError> {
    let target = SqliteTarget::open(&config.store_location)?;
    let source = SheetsSource::from_config(config)?;
    Ok((Arc::new(source), Arc::new(target)))
}

/// Run the engine against the configured spreadsheet and store until an
/// interrupt arrives or a cycle fails.
pub async fn run(config: Config) -> Result<RunReport, DaemonError> {
    let (source, target) = open_adapters(&config)?;
    let engine = Engine::new(source, target, config.poll_interval);

    let cancel = CancellationToken::new();
    let watcher = spawn_interrupt_watcher(cancel.clone());
    let result = engine.run(cancel.clone()).await;
    cancel.cancel();
    let _ = watcher.await;

    if let Ok(report) = &result {
        tracing::info!(
            cycles = report.cycles,
            persisted = report.persisted,
            "sync engine shut down cleanly",
        );
    }
    result
}

/// How a one-shot cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SyncOutcome {
    Completed(CycleSummary),
    /// Interrupted before the cycle finished. Nothing after the interrupted
    /// step ran.
    Cancelled,
}

/// One cycle under the engine's cancellation rule: an error seen after
/// `cancel` fired is the cancelled outcome, not a failure.
pub async fn cycle_once(
    source: &dyn DataSource,
    target: &dyn DataTarget,
    cancel: &CancellationToken,
) -> Result<SyncOutcome, DaemonError> {
    match sync_once(source, target, cancel).await {
        Ok(summary) => Ok(SyncOutcome::Completed(summary)),
        Err(err) if cancel.is_cancelled() => {
            tracing::info!(error = %err, "cycle interrupted by cancellation");
            Ok(SyncOutcome::Cancelled)
        }
        Err(err) => Err(err.into()),
    }
}

/// A single cycle against the configured spreadsheet and store.
pub async fn run_once(config: Config) -> Result<SyncOutcome, DaemonError> {
    let (source, target) = open_adapters(&config)?;

    let cancel = CancellationToken::new();
    let watcher = spawn_interrupt_watcher(cancel.clone());
    let outcome = cycle_once(&*source, &*target, &cancel).await;
    cancel.cancel();
    let _ = watcher.await;

    outcome
}

/// Start the engine and block the current thread until it exits.
pub fn start_blocking(config: Config) -> Result<RunReport, DaemonError> {
    init_tracing();
    build_runtime()?.block_on(run(config))
}

/// [`run_once`] on a fresh runtime.
pub fn sync_blocking(config: Config) -> Result<SyncOutcome, DaemonError> {
    init_tracing();
    build_runtime()?.block_on(run_once(config))
}

fn build_runtime() -> Result<tokio::runtime::Runtime, DaemonError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))
}

/// Install the global subscriber. Filter from `RUST_LOG` (default `info`);
/// `POLLNPULL_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("POLLNPULL_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollnpull_core::Developer;
    use pollnpull_sync::memory::{MemorySource, MemoryTarget};

    fn engine_with(rows: Vec<Developer>) -> (Engine, Arc<MemoryTarget>) {
        let target = Arc::new(MemoryTarget::new());
        let engine = Engine::new(
            Arc::new(MemorySource::new(rows)),
            target.clone(),
            Duration::from_secs(30),
        );
        (engine, target)
    }

    #[test]
    fn report_accumulates_cycles() {
        let mut report = RunReport::new();
        report.record(CycleSummary {
            persisted: 2,
            failed: 1,
            ..CycleSummary::default()
        });
        report.record(CycleSummary::default());
        assert_eq!(report.cycles, 2);
        assert_eq!(report.persisted, 2);
        assert_eq!(report.failed_rows, 1);
        assert_eq!(report.last_cycle, Some(CycleSummary::default()));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn stopped_engine_cannot_restart() {
        let (engine, _target) = engine_with(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        engine.run(cancel.clone()).await.expect("cancelled run");
        assert_eq!(engine.state(), EngineState::Stopped);

        let err = engine.run(cancel).await.unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyStopped), "got: {err}");
    }

    #[test]
    fn sync_outcome_is_tagged_in_json() {
        let done = serde_json::to_value(SyncOutcome::Completed(CycleSummary {
            persisted: 3,
            ..CycleSummary::default()
        }))
        .expect("serialize");
        assert_eq!(done["outcome"], "completed");
        assert_eq!(done["persisted"], 3);

        let cancelled = serde_json::to_value(SyncOutcome::Cancelled).expect("serialize");
        assert_eq!(cancelled, serde_json::json!({ "outcome": "cancelled" }));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn claim_rejects_concurrent_run() {
        let (engine, _target) = engine_with(vec![]);
        engine.claim().expect("first claim");
        let err = engine.claim().unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyRunning), "got: {err}");
    }
}
