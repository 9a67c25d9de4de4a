use std::collections::BTreeMap;
use std::fmt::Write;

use ow_core::alerts::AlertLevel;
use ow_sync::store::ViewModel;

use super::AppContext;

/// Run the `status` subcommand: one refresh, then a summary.
pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let model = ctx.snapshot().await?;
    print!("{}", render(&model, &ctx.config.api.base_url));
    Ok(())
}

pub fn render(model: &ViewModel, base_url: &str) -> String {
    let budget = &model.budget;
    let used = budget
        .used_ratio()
        .map(|r| format!("{:.1}% used", r * 100.0))
        .unwrap_or_else(|| "usage n/a".into());

    let mut by_status: BTreeMap<&str, usize> = BTreeMap::new();
    for task in &model.tasks {
        *by_status.entry(task.status.as_str()).or_default() += 1;
    }

    let mut out = String::new();
    let _ = writeln!(out, "orgwatch status  ({base_url})");
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(
        out,
        "Budget left:    {:.2} / {:.2}  ({used})",
        budget.budget_left, budget.budget_total
    );
    let _ = writeln!(out, "Alert level:    {}", AlertLevel::for_budget(budget));
    let _ = writeln!(out, "Tasks:          {}", model.tasks.len());
    for (status, count) in &by_status {
        let _ = writeln!(out, "  {:<14}{count}", format!("{status}:"));
    }
    let _ = writeln!(out, "Dependencies:   {}", model.dependencies.len());
    let _ = writeln!(out, "Artifacts:      {}", model.artifacts.len());
    out
}
