use super::{friendly_error, status, AppContext};

/// Run the `purpose` subcommand: submit a purpose, print the blueprint, then
/// show the refreshed status.
pub async fn run(ctx: &AppContext, purpose: &str) -> anyhow::Result<()> {
    let blueprint = submit(ctx, purpose).await?;
    println!("{blueprint}");
    println!();

    // The backend has new tasks now; a failed refresh is not a failed submit.
    match ctx.snapshot().await {
        Ok(model) => print!("{}", status::render(&model, &ctx.config.api.base_url)),
        Err(e) => tracing::warn!(error = %e, "refresh after purpose submission failed"),
    }
    Ok(())
}

pub async fn submit(ctx: &AppContext, purpose: &str) -> anyhow::Result<String> {
    ctx.client()
        .submit_purpose(purpose)
        .await
        .map_err(|e| friendly_error(e, &ctx.config.api.base_url))
}
