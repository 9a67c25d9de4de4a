use std::fmt::Write;

use ow_core::detail::TaskDetail;
use ow_sync::client::ApiClient;

use super::AppContext;

/// Run the `task` subcommand: detail view of one task and its artifacts.
pub async fn run(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    let model = ctx.snapshot().await?;
    let Some(detail) = model.task_detail(id) else {
        anyhow::bail!("Task {id:?} not found ({} tasks loaded)", model.tasks.len());
    };
    print!("{}", render(&detail, &ctx.client()));
    Ok(())
}

pub fn render(detail: &TaskDetail, client: &ApiClient) -> String {
    let task = &detail.task;
    let mut out = String::new();
    let _ = writeln!(out, "{}  [{}]", task.id, task.status);
    let _ = writeln!(out, "{}", task.description);
    let _ = writeln!(out, "{}", "-".repeat(40));
    if let Some(bv) = task.business_value {
        let _ = writeln!(out, "Business value: {bv}");
    }
    if let Some(tokens) = detail.tokens_label() {
        let _ = writeln!(out, "Tokens:         {tokens}");
    }
    if let Some(owner) = &task.owner {
        let _ = writeln!(out, "Owner:          {owner}");
    }
    if let Some(notes) = &task.notes {
        let _ = writeln!(out, "Notes:          {notes}");
    }

    if detail.artifacts.is_empty() {
        let _ = writeln!(out, "No artifacts.");
        return out;
    }
    let _ = writeln!(out, "Artifacts ({}):", detail.artifacts.len());
    for view in &detail.artifacts {
        let created = view
            .artifact
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "  {}  {}  {}  {}",
            view.display_path,
            view.artifact.media_type,
            created,
            client.resolve_url(&view.artifact.url)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{backend, context, serve};

    #[tokio::test]
    async fn task_detail_lists_own_artifacts_with_display_paths() {
        let base = serve(backend()).await;
        let ctx = context(&base);
        let model = ctx.snapshot().await.unwrap();
        let detail = model.task_detail("t1").unwrap();
        let out = render(&detail, &ctx.client());

        assert!(out.starts_with("t1  [done]\nPlan the launch\n"), "{out}");
        assert!(out.contains("Tokens:         1000 / 1200"));
        assert!(out.contains("Artifacts (1):"));
        assert!(out.contains(&format!(
            "  docs/plan.md  text/markdown  2025-01-01 12:00  {base}/artifact/a1"
        )));
        assert!(!out.contains("main.rs"));
    }

    #[tokio::test]
    async fn unknown_task_is_an_error() {
        let base = serve(backend()).await;
        let err = run(&context(&base), "nope").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn task_command_runs() {
        let base = serve(backend()).await;
        assert!(run(&context(&base), "t2").await.is_ok());
    }
}
