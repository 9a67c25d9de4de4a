//! Last-issued-wins store for the dashboard view model.
//!
//! Every refresh takes a generation from [`ViewStore::issue`] before it
//! starts and hands its result back through [`ViewStore::resolve`]. A result
//! is applied only if no higher generation has resolved yet, so a slow
//! refresh that finishes after a newer one can never regress the view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ow_api_types::{Artifact, BudgetSnapshot, Dependency, Task};
use ow_core::detail::{TaskDetail, TaskDetailProjector};
use ow_core::graph::{GraphModel, GraphModelBuilder};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{Result, SyncError};

/// One consistent snapshot of every read endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    /// Generation the snapshot was applied under; `0` until applied.
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub budget: BudgetSnapshot,
    pub tasks: Vec<Task>,
    pub dependencies: Vec<Dependency>,
    pub artifacts: Vec<Artifact>,
}

impl ViewModel {
    pub fn graph(&self) -> GraphModel {
        GraphModelBuilder::build(&self.tasks, &self.dependencies)
    }

    pub fn task_detail(&self, task_id: &str) -> Option<TaskDetail> {
        TaskDetailProjector::project(task_id, &self.tasks, &self.artifacts)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Last successfully applied snapshot.
    pub model: Option<Arc<ViewModel>>,
    pub applied_generation: u64,
    /// Highest generation that has resolved, successfully or not.
    pub resolved_generation: u64,
    /// Set when the newest resolution was a failure; cleared on success.
    pub last_error: Option<SyncError>,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// A newer generation already resolved; the result was discarded.
    Stale,
    /// The newest resolution failed; the previous model is kept.
    Failed,
    /// The store was closed; nothing is applied any more.
    Closed,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Applied => "applied",
            Resolution::Stale => "stale",
            Resolution::Failed => "failed",
            Resolution::Closed => "closed",
        }
    }
}

pub struct ViewStore {
    next_generation: AtomicU64,
    state: watch::Sender<ViewState>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self {
            next_generation: AtomicU64::new(1),
            state: watch::Sender::new(ViewState::default()),
        }
    }

    /// Reserve the generation for a refresh that is about to start.
    pub fn issue(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    pub fn resolve(&self, generation: u64, result: Result<ViewModel>) -> Resolution {
        let mut resolution = Resolution::Closed;
        self.state.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            if generation <= state.resolved_generation {
                resolution = Resolution::Stale;
                return false;
            }
            state.resolved_generation = generation;
            match result {
                Ok(mut model) => {
                    model.generation = generation;
                    state.model = Some(Arc::new(model));
                    state.applied_generation = generation;
                    state.last_error = None;
                    resolution = Resolution::Applied;
                }
                Err(err) => {
                    state.last_error = Some(err);
                    resolution = Resolution::Failed;
                }
            }
            true
        });

        if resolution == Resolution::Applied {
            let metrics = ow_telemetry::metrics::global_metrics();
            metrics.set_gauge("view_generation", generation as i64);
            if let Some(model) = self.current() {
                metrics.set_gauge("view_tasks", model.tasks.len() as i64);
            }
        }
        tracing::debug!(generation, resolution = resolution.as_str(), "refresh resolved");
        resolution
    }

    /// Stop accepting resolutions. Idempotent.
    pub fn close(&self) {
        self.state.send_if_modified(|state| {
            let changed = !state.closed;
            state.closed = true;
            changed
        });
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    pub fn current(&self) -> Option<Arc<ViewModel>> {
        self.state.borrow().model.clone()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}
