use std::path::Path;

use super::{friendly_error, AppContext};

/// `templates list`
pub async fn list(ctx: &AppContext) -> anyhow::Result<()> {
    let names = ctx
        .client()
        .list_templates()
        .await
        .map_err(|e| friendly_error(e, &ctx.config.api.base_url))?;
    if names.is_empty() {
        println!("No templates.");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// `templates show <name>`
pub async fn show(ctx: &AppContext, name: &str) -> anyhow::Result<()> {
    let content = ctx
        .client()
        .get_template(name)
        .await
        .map_err(|e| friendly_error(e, &ctx.config.api.base_url))?;
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// `templates save <name> <file>`
pub async fn save(ctx: &AppContext, name: &str, file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| anyhow::anyhow!("Could not read {}: {e}", file.display()))?;
    ctx.client()
        .save_template(name, &content)
        .await
        .map_err(|e| friendly_error(e, &ctx.config.api.base_url))?;
    println!("Saved template {name:?} ({} bytes).", content.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path as UrlPath, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::commands::testing::{context, serve};

    type Stored = Arc<Mutex<Vec<(String, String)>>>;

    fn app(stored: Stored) -> Router {
        Router::new()
            .route(
                "/api/templates/",
                get(|State(stored): State<Stored>| async move {
                    let names: Vec<String> =
                        stored.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
                    Json(json!(names))
                }),
            )
            .route(
                "/api/templates/{name}",
                get(|UrlPath(name): UrlPath<String>, State(stored): State<Stored>| async move {
                    let found = stored
                        .lock()
                        .unwrap()
                        .iter()
                        .find(|(n, _)| *n == name)
                        .map(|(_, c)| c.clone());
                    match found {
                        Some(content) => (StatusCode::OK, Json(json!({"content": content}))),
                        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"}))),
                    }
                })
                .put(
                    |UrlPath(name): UrlPath<String>,
                     State(stored): State<Stored>,
                     Json(body): Json<Value>| async move {
                        let content = body["content"].as_str().unwrap_or_default().to_string();
                        stored.lock().unwrap().push((name, content));
                        Json(json!({"ok": true}))
                    },
                ),
            )
            .with_state(stored)
    }

    #[tokio::test]
    async fn save_list_show() {
        let stored = Stored::default();
        let base = serve(app(stored.clone())).await;
        let ctx = context(&base);

        let file = std::env::temp_dir().join(format!("ow-template-{}.md", uuid::Uuid::new_v4()));
        std::fs::write(&file, "# Weekly\n").unwrap();

        save(&ctx, "weekly", &file).await.unwrap();
        assert_eq!(
            *stored.lock().unwrap(),
            vec![("weekly".to_string(), "# Weekly\n".to_string())]
        );
        list(&ctx).await.unwrap();
        show(&ctx, "weekly").await.unwrap();

        let _ = std::fs::remove_file(&file);
    }

    #[tokio::test]
    async fn missing_template_shows_backend_detail() {
        let base = serve(app(Stored::default())).await;
        let err = show(&context(&base), "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Not Found");
    }

    #[tokio::test]
    async fn unreadable_file_is_reported() {
        let base = serve(app(Stored::default())).await;
        let missing = std::env::temp_dir().join(format!("ow-missing-{}", uuid::Uuid::new_v4()));
        let err = save(&context(&base), "x", &missing).await.unwrap_err();
        assert!(err.to_string().starts_with("Could not read"));
    }
}
