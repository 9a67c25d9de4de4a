//! Shared API types for the orgwatch dashboard client.
//!
//! These mirror the JSON served by the project-automation backend. Unknown
//! fields are ignored and every optional field has a serde default, so a
//! sparsely populated payload decodes instead of failing the whole poll.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle status reported by the backend for a task.
///
/// Strings outside the known set decode into [`TaskStatus::Other`] with the
/// raw value preserved, so a new backend status never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
    Failed,
    Blocked,
    Skipped,
    BudgetExceeded,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Skipped => "skipped",
            TaskStatus::BudgetExceeded => "budget_exceeded",
            TaskStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "todo" => TaskStatus::Todo,
            "doing" => TaskStatus::Doing,
            "done" => TaskStatus::Done,
            "failed" => TaskStatus::Failed,
            "blocked" => TaskStatus::Blocked,
            "skipped" => TaskStatus::Skipped,
            "budget_exceeded" => TaskStatus::BudgetExceeded,
            _ => TaskStatus::Other(raw),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(raw: &str) -> Self {
        TaskStatus::from(raw.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Read-path response types ──

/// A unit of work tracked by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub business_value: Option<f64>,
    #[serde(default)]
    pub tokens_plan: Option<u64>,
    #[serde(default)]
    pub tokens_actual: Option<u64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: TaskStatus::Todo,
            business_value: None,
            tokens_plan: None,
            tokens_actual: None,
            owner: None,
            notes: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<TaskStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_business_value(mut self, value: f64) -> Self {
        self.business_value = Some(value);
        self
    }

    pub fn with_tokens(mut self, plan: Option<u64>, actual: Option<u64>) -> Self {
        self.tokens_plan = plan;
        self.tokens_actual = actual;
        self
    }
}

/// Directed edge between two task ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub from_id: String,
    pub to_id: String,
}

impl Dependency {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
        }
    }
}

/// A file produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub task_id: String,
    #[serde(default)]
    pub repo_path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Description of the owning task, when the backend joins it in.
    #[serde(default)]
    pub task_desc: Option<String>,
}

/// Body of `GET /`.
///
/// `budget_total` is absent on older backends; it then decodes as `0.0`,
/// which downstream consumers treat as "ratio undefined".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    #[serde(default)]
    pub budget_left: f64,
    #[serde(default)]
    pub budget_total: f64,
}

impl BudgetSnapshot {
    pub fn new(budget_left: f64, budget_total: f64) -> Self {
        Self {
            budget_left,
            budget_total,
        }
    }

    /// Fraction of the budget consumed, or `None` when the total is zero,
    /// negative or not a finite number.
    pub fn used_ratio(&self) -> Option<f64> {
        if !self.budget_total.is_finite() || self.budget_total <= 0.0 || !self.budget_left.is_finite()
        {
            return None;
        }
        Some(1.0 - self.budget_left / self.budget_total)
    }
}

/// Body of `GET /api/graph`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

// ── Write-path request/response types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurposeRequest {
    pub purpose: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurposeResponse {
    #[serde(default)]
    pub blueprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Body of `GET /api/templates/{name}` and `PUT /api/templates/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateContent {
    #[serde(default)]
    pub content: String,
}

/// Error body returned by the backend on rejected writes.
///
/// `detail` is usually a string, but request-validation failures carry a
/// list of objects instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp decoding
// ---------------------------------------------------------------------------

/// Accept RFC 3339 timestamps as well as the naive ISO form
/// (`2025-01-01T12:00:00[.ffffff]`) the backend emits, read as UTC.
/// Unparseable values decode as `None` rather than failing the payload.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_known_values() {
        let s: TaskStatus = serde_json::from_str("\"budget_exceeded\"").unwrap();
        assert_eq!(s, TaskStatus::BudgetExceeded);
        assert_eq!(serde_json::to_string(&TaskStatus::Doing).unwrap(), "\"doing\"");
    }

    #[test]
    fn status_unknown_value_is_preserved() {
        let s: TaskStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(s, TaskStatus::Other("cancelled".into()));
        assert_eq!(s.to_string(), "cancelled");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"cancelled\"");
    }

    #[test]
    fn task_decodes_with_missing_optionals() {
        let t: Task = serde_json::from_str(r#"{"id":"t1","description":"Write docs"}"#).unwrap();
        assert_eq!(t.status, TaskStatus::Todo);
        assert!(t.business_value.is_none());
        assert!(t.tokens_plan.is_none());
    }

    #[test]
    fn task_ignores_backend_extras() {
        let json = r#"{
            "id": "ab12cd34",
            "tenant_id": "demo",
            "purpose_id": null,
            "description": "Design schema",
            "business_value": 3.5,
            "tokens_plan": 1200,
            "tokens_actual": 0,
            "purpose_relevance": 0.4,
            "status": "doing",
            "owner": "Dev",
            "notes": "",
            "created_at": "2025-01-01T10:00:00"
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.status, TaskStatus::Doing);
        assert_eq!(t.business_value, Some(3.5));
        assert_eq!(t.tokens_plan, Some(1200));
        assert_eq!(t.owner.as_deref(), Some("Dev"));
    }

    #[test]
    fn artifact_accepts_naive_timestamp() {
        let json = r#"{
            "id": "a1",
            "task_id": "t1",
            "task_desc": "Design schema",
            "repo_path": "demo/schema.sql",
            "media_type": "text/x-source",
            "created_at": "2025-03-04T05:06:07.123456",
            "url": "/artifact/a1"
        }"#;
        let a: Artifact = serde_json::from_str(json).unwrap();
        let ts = a.created_at.unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-04T05:06:07.123456+00:00");
    }

    #[test]
    fn artifact_bad_timestamp_is_none() {
        let a: Artifact =
            serde_json::from_str(r#"{"id":"a1","task_id":"t1","created_at":"yesterday"}"#).unwrap();
        assert!(a.created_at.is_none());
    }

    #[test]
    fn budget_without_total_has_no_ratio() {
        let b: BudgetSnapshot =
            serde_json::from_str(r#"{"status":"alive","budget_left":12.5}"#).unwrap();
        assert_eq!(b.budget_left, 12.5);
        assert_eq!(b.used_ratio(), None);
    }

    #[test]
    fn budget_ratio() {
        let b = BudgetSnapshot::new(25.0, 100.0);
        assert!((b.used_ratio().unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn error_detail_message() {
        let d: ErrorDetail = serde_json::from_str(r#"{"detail":"Purpose already has tasks"}"#).unwrap();
        assert_eq!(d.message().as_deref(), Some("Purpose already has tasks"));

        let d: ErrorDetail = serde_json::from_str(r#"{"detail":[{"msg":"field required"}]}"#).unwrap();
        assert_eq!(d.message().as_deref(), Some(r#"[{"msg":"field required"}]"#));

        let d: ErrorDetail = serde_json::from_str("{}").unwrap();
        assert_eq!(d.message(), None);
    }

    #[test]
    fn graph_payload_defaults() {
        let g: GraphPayload = serde_json::from_str("{}").unwrap();
        assert!(g.tasks.is_empty());
        assert!(g.dependencies.is_empty());
    }
}
