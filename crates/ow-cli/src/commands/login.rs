use std::io::{BufRead, Write};

use super::{friendly_error, AppContext};

/// Run the `login` subcommand: exchange credentials for a token and store it.
pub async fn run(ctx: &AppContext, username: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    login(ctx, username, &password).await?;
    println!(
        "Logged in as {username}. Token stored in {}",
        ctx.token_file.path.display()
    );
    Ok(())
}

pub async fn login(ctx: &AppContext, username: &str, password: &str) -> anyhow::Result<()> {
    let token = ctx
        .client()
        .login(username, password)
        .await
        .map_err(|e| friendly_error(e, &ctx.config.api.base_url))?;
    ctx.token_file.store(&token)?;
    tracing::info!(username, "login succeeded");
    Ok(())
}

/// Run the `logout` subcommand.
pub fn logout(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.token_file.remove()?;
    println!("Logged out.");
    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
