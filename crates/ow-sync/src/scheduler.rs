//! Fixed-cadence, single-flight polling loop.
//!
//! ```text
//!   start ──► IDLE ──tick──► POLLING ──resolve──► IDLE ──tick──► ...
//!               ▲               │
//!               └─tick skipped──┘          stop (any state) ──► STOPPED
//! ```
//!
//! The loop owns the [`BudgetAlertStateMachine`]; consumers observe its
//! [`AlertState`] through a watch channel and receive [`SyncEvent`]s over a
//! flume channel.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::OptionFuture;
use ow_api_types::BudgetSnapshot;
use ow_core::alerts::{AlertState, BudgetAlert, BudgetAlertStateMachine};
use ow_telemetry::metrics::global_metrics;
use ow_telemetry::tracing_setup::create_operation_span;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::aggregator::SnapshotAggregator;
use crate::error::{Result, SyncError};
use crate::shutdown::ShutdownSignal;
use crate::store::{Resolution, ViewModel, ViewState, ViewStore};

type InFlight = Pin<Box<dyn Future<Output = (u64, Result<ViewModel>, Duration)> + Send>>;

/// Something the UI layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A refresh was applied to the view store.
    Refreshed {
        generation: u64,
        tasks: usize,
        budget: BudgetSnapshot,
    },
    /// A budget threshold was crossed for the first time this session.
    BudgetAlert(BudgetAlert),
    /// A refresh failed. Identical consecutive failures are reported once.
    SyncFailed(SyncError),
    /// First successful refresh after one or more failures.
    Recovered,
}

#[derive(Debug)]
enum Command {
    RefreshNow,
}

pub struct SyncScheduler {
    aggregator: SnapshotAggregator,
    interval: Duration,
    store: Arc<ViewStore>,
    shutdown: ShutdownSignal,
}

impl SyncScheduler {
    pub fn new(aggregator: SnapshotAggregator, interval: Duration) -> Self {
        Self {
            aggregator,
            interval,
            store: Arc::new(ViewStore::new()),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Share an existing store, e.g. with ad-hoc refreshes issued elsewhere.
    pub fn with_store(mut self, store: Arc<ViewStore>) -> Self {
        self.store = store;
        self
    }

    /// Stop when this signal fires, in addition to [`SyncHandle::stop`].
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Spawn the loop on the current tokio runtime. The first refresh is
    /// issued immediately.
    pub fn start(self) -> SyncHandle {
        let (event_tx, event_rx) = flume::unbounded();
        let (command_tx, command_rx) = flume::unbounded();
        let (alert_tx, alert_rx) = watch::channel(AlertState::default());

        let state = LoopState {
            aggregator: Arc::new(self.aggregator),
            store: self.store.clone(),
            alerts: BudgetAlertStateMachine::new(),
            alert_tx,
            events: event_tx,
            last_error: None,
        };
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "sync scheduler started");
        let task = tokio::spawn(run(state, self.interval, command_rx, self.shutdown.clone()));

        SyncHandle {
            events: event_rx,
            commands: command_tx,
            alerts: alert_rx,
            store: self.store,
            shutdown: self.shutdown,
            task,
        }
    }
}

/// Owner-side handle of a running scheduler. Dropping it stops the loop.
pub struct SyncHandle {
    events: flume::Receiver<SyncEvent>,
    commands: flume::Sender<Command>,
    alerts: watch::Receiver<AlertState>,
    store: Arc<ViewStore>,
    shutdown: ShutdownSignal,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn events(&self) -> &flume::Receiver<SyncEvent> {
        &self.events
    }

    pub fn store(&self) -> &Arc<ViewStore> {
        &self.store
    }

    pub fn view(&self) -> Option<Arc<ViewModel>> {
        self.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.store.subscribe()
    }

    pub fn alert_state(&self) -> AlertState {
        *self.alerts.borrow()
    }

    pub fn alerts(&self) -> watch::Receiver<AlertState> {
        self.alerts.clone()
    }

    /// Request an out-of-band refresh. Still single-flight: ignored while a
    /// refresh is running. Returns `false` once the loop has exited.
    pub fn refresh_now(&self) -> bool {
        self.commands.send(Command::RefreshNow).is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the timer, abort any in-flight refresh and wait for the loop
    /// to exit. Results that resolve afterwards are never applied.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.store.close();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "sync loop ended abnormally");
        }
    }
}

struct LoopState {
    aggregator: Arc<SnapshotAggregator>,
    store: Arc<ViewStore>,
    alerts: BudgetAlertStateMachine,
    alert_tx: watch::Sender<AlertState>,
    events: flume::Sender<SyncEvent>,
    last_error: Option<SyncError>,
}

async fn run(
    mut state: LoopState,
    interval: Duration,
    commands: flume::Receiver<Command>,
    shutdown: ShutdownSignal,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<InFlight> = None;
    let stopped = shutdown.wait();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            biased;

            _ = &mut stopped => break,

            Some((generation, result, elapsed)) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                in_flight = None;
                state.settle(generation, result, elapsed);
            }

            _ = ticker.tick() => state.begin(&mut in_flight, "tick"),

            command = commands.recv_async() => match command {
                Ok(Command::RefreshNow) => state.begin(&mut in_flight, "manual"),
                // Handle dropped.
                Err(_) => break,
            },
        }
    }

    if in_flight.take().is_some() {
        global_metrics().increment_counter("sync_refresh_total", &[("outcome", "aborted")]);
        tracing::debug!("in-flight refresh aborted");
    }
    state.store.close();
    tracing::info!("sync scheduler stopped");
}

impl LoopState {
    fn begin(&self, in_flight: &mut Option<InFlight>, trigger: &'static str) {
        if in_flight.is_some() {
            global_metrics().increment_counter("sync_ticks_skipped_total", &[]);
            tracing::debug!(trigger, "refresh still in flight, skipping");
            return;
        }

        let generation = self.store.issue();
        let aggregator = self.aggregator.clone();
        let (span, trace_id) = create_operation_span("refresh");
        tracing::debug!(generation, trigger, %trace_id, "refresh issued");

        *in_flight = Some(Box::pin(
            async move {
                let started = Instant::now();
                let result = aggregator.refresh().await;
                (generation, result, started.elapsed())
            }
            .instrument(span),
        ));
    }

    fn settle(&mut self, generation: u64, result: Result<ViewModel>, elapsed: Duration) {
        let metrics = global_metrics();
        metrics.record_histogram("sync_refresh_duration_seconds", elapsed.as_secs_f64());

        let summary = result
            .as_ref()
            .ok()
            .map(|model| (model.budget, model.tasks.len()));
        let error = result.as_ref().err().cloned();

        let resolution = self.store.resolve(generation, result);
        metrics.increment_counter("sync_refresh_total", &[("outcome", resolution.as_str())]);

        match (resolution, summary, error) {
            (Resolution::Applied, Some((budget, tasks)), _) => {
                if self.last_error.take().is_some() {
                    tracing::info!(generation, "sync recovered");
                    self.emit(SyncEvent::Recovered);
                }
                self.emit(SyncEvent::Refreshed {
                    generation,
                    tasks,
                    budget,
                });
                if let Some(alert) = self.alerts.update(&budget) {
                    metrics.increment_counter("budget_alerts_total", &[("level", alert.level.as_str())]);
                    self.alert_tx.send_replace(self.alerts.state());
                    self.emit(SyncEvent::BudgetAlert(alert));
                }
            }
            (Resolution::Failed, _, Some(err)) => {
                if self.last_error.as_ref() == Some(&err) {
                    tracing::debug!(generation, error = %err, "refresh failed again");
                } else {
                    tracing::warn!(generation, error = %err, "refresh failed");
                    self.emit(SyncEvent::SyncFailed(err.clone()));
                }
                self.last_error = Some(err);
            }
            (resolution, _, _) => {
                tracing::debug!(generation, resolution = resolution.as_str(), "refresh discarded");
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No receiver left means nobody is watching; the loop keeps going
        // until it is stopped.
        let _ = self.events.send(event);
    }
}
