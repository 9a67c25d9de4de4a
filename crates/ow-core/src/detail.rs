//! Selected task + artifact list → task detail view.

use ow_api_types::{Artifact, Task};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactView {
    pub artifact: Artifact,
    /// `repo_path` with its leading segment removed, for presentation only.
    pub display_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub artifacts: Vec<ArtifactView>,
}

impl TaskDetail {
    /// `"plan / actual"` with `-` for a missing side, or `None` when both
    /// are missing.
    pub fn tokens_label(&self) -> Option<String> {
        if self.task.tokens_plan.is_none() && self.task.tokens_actual.is_none() {
            return None;
        }
        let side = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
        Some(format!(
            "{} / {}",
            side(self.task.tokens_plan),
            side(self.task.tokens_actual)
        ))
    }
}

/// Strip everything up to and including the first `/`.
///
/// `"demo/src/main.py"` → `"src/main.py"`. A path without a separator is
/// returned unchanged.
pub fn display_path(repo_path: &str) -> &str {
    match repo_path.split_once('/') {
        Some((head, rest)) if !head.is_empty() => rest,
        _ => repo_path,
    }
}

pub struct TaskDetailProjector;

impl TaskDetailProjector {
    /// Project the detail view for `selected_task_id`.
    ///
    /// Returns `None` when the id is not among `tasks`. Artifacts are those
    /// whose `task_id` matches, in their original relative order.
    pub fn project(selected_task_id: &str, tasks: &[Task], artifacts: &[Artifact]) -> Option<TaskDetail> {
        let task = tasks.iter().find(|t| t.id == selected_task_id)?;
        let artifacts = artifacts
            .iter()
            .filter(|a| a.task_id == selected_task_id)
            .map(|a| ArtifactView {
                display_path: display_path(&a.repo_path).to_string(),
                artifact: a.clone(),
            })
            .collect();
        Some(TaskDetail {
            task: task.clone(),
            artifacts,
        })
    }
}
