use async_trait::async_trait;
use ow_api_types::{Artifact, BudgetSnapshot, GraphPayload, Task};

use crate::error::Result;

pub const BUDGET_PATH: &str = "/";
pub const BACKLOG_PATH: &str = "/backlog";
pub const GRAPH_PATH: &str = "/api/graph";
pub const ARTIFACTS_PATH: &str = "/api/artifacts";
pub const PURPOSE_PATH: &str = "/api/purpose";
pub const LOGIN_PATH: &str = "/api/login";
pub const TEMPLATES_PATH: &str = "/api/templates";

/// The read endpoints a refresh cycle depends on.
///
/// [`crate::client::ApiClient`] is the HTTP implementation; tests plug in
/// in-memory fakes with controlled latency and failures.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// `GET /`
    async fn budget(&self) -> Result<BudgetSnapshot>;
    /// `GET /backlog`
    async fn backlog(&self) -> Result<Vec<Task>>;
    /// `GET /api/graph`
    async fn graph(&self) -> Result<GraphPayload>;
    /// `GET /api/artifacts`
    async fn artifacts(&self) -> Result<Vec<Artifact>>;
}
