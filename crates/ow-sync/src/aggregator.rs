use std::sync::Arc;

use chrono::Utc;
use ow_core::config::TaskSource;

use crate::backend::{DashboardBackend, ARTIFACTS_PATH, BACKLOG_PATH, BUDGET_PATH, GRAPH_PATH};
use crate::error::{Result, SyncError};
use crate::store::ViewModel;

/// Issues every read of one refresh cycle concurrently and assembles the
/// results into a single [`ViewModel`].
///
/// All-or-nothing: the first failing read fails the cycle and the remaining
/// reads are dropped.
#[derive(Clone)]
pub struct SnapshotAggregator {
    backend: Arc<dyn DashboardBackend>,
    source: TaskSource,
}

impl SnapshotAggregator {
    pub fn new(backend: Arc<dyn DashboardBackend>, source: TaskSource) -> Self {
        Self { backend, source }
    }

    pub fn source(&self) -> TaskSource {
        self.source
    }

    pub async fn refresh(&self) -> Result<ViewModel> {
        let budget = async {
            self.backend
                .budget()
                .await
                .map_err(|e| SyncError::partial(endpoint(BUDGET_PATH), e))
        };
        let tasks = async {
            match self.source {
                TaskSource::Graph => self
                    .backend
                    .graph()
                    .await
                    .map(|g| (g.tasks, g.dependencies))
                    .map_err(|e| SyncError::partial(endpoint(GRAPH_PATH), e)),
                // The backlog carries no dependency information.
                TaskSource::Backlog => self
                    .backend
                    .backlog()
                    .await
                    .map(|tasks| (tasks, Vec::new()))
                    .map_err(|e| SyncError::partial(endpoint(BACKLOG_PATH), e)),
            }
        };
        let artifacts = async {
            self.backend
                .artifacts()
                .await
                .map_err(|e| SyncError::partial(endpoint(ARTIFACTS_PATH), e))
        };

        let (budget, (tasks, dependencies), artifacts) =
            tokio::try_join!(budget, tasks, artifacts)?;

        tracing::debug!(
            tasks = tasks.len(),
            dependencies = dependencies.len(),
            artifacts = artifacts.len(),
            budget_left = budget.budget_left,
            "snapshot assembled"
        );

        Ok(ViewModel {
            generation: 0,
            fetched_at: Utc::now(),
            budget,
            tasks,
            dependencies,
            artifacts,
        })
    }
}

fn endpoint(path: &'static str) -> &'static str {
    match path {
        BUDGET_PATH => "GET /",
        BACKLOG_PATH => "GET /backlog",
        GRAPH_PATH => "GET /api/graph",
        ARTIFACTS_PATH => "GET /api/artifacts",
        _ => "GET",
    }
}
