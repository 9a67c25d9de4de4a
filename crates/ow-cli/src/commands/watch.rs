use ow_core::notify::{NotificationCenter, Toast, ToastLevel};
use ow_sync::scheduler::{SyncEvent, SyncScheduler};
use ow_sync::shutdown::ShutdownSignal;
use ow_telemetry::metrics::global_metrics;

use super::AppContext;

/// Run the `watch` subcommand until Ctrl-C.
pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let shutdown = ShutdownSignal::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.trigger();
        }
    });

    println!(
        "Watching {} every {} ms (Ctrl-C to stop)",
        ctx.config.api.base_url, ctx.config.sync.interval_ms
    );
    run_until(ctx, shutdown, |line| println!("{line}")).await
}

/// Poll until `shutdown` fires, handing every rendered line to `emit`.
pub async fn run_until(
    ctx: &AppContext,
    shutdown: ShutdownSignal,
    mut emit: impl FnMut(&str),
) -> anyhow::Result<()> {
    let handle = SyncScheduler::new(ctx.aggregator(), ctx.config.sync.interval())
        .with_shutdown(shutdown)
        .start();
    let mut center = NotificationCenter::new();

    // Ends when the loop exits and drops its sender.
    while let Ok(event) = handle.events().recv_async().await {
        center.tick();
        emit(&render_event(&event, &mut center));
    }

    handle.stop().await;
    tracing::debug!(metrics = %global_metrics().export_prometheus(), "sync metrics at exit");
    Ok(())
}

pub fn render_event(event: &SyncEvent, center: &mut NotificationCenter) -> String {
    match event {
        SyncEvent::Refreshed {
            generation,
            tasks,
            budget,
        } => {
            let used = budget
                .used_ratio()
                .map(|r| format!(", {:.1}% used", r * 100.0))
                .unwrap_or_default();
            return format!(
                "#{generation}  {tasks} tasks  budget {:.2}/{:.2}{used}",
                budget.budget_left, budget.budget_total
            );
        }
        SyncEvent::BudgetAlert(alert) => center.alert(alert),
        SyncEvent::SyncFailed(err) => center.error(err.to_string()),
        SyncEvent::Recovered => center.push(Toast::new("Connection restored", ToastLevel::Success)),
    }
    center.iter().last().map(Toast::line).unwrap_or_default()
}
