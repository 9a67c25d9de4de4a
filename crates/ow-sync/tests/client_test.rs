use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use ow_api_types::TaskStatus;
use ow_sync::backend::DashboardBackend;
use ow_sync::client::ApiClient;
use ow_sync::session::{Anonymous, CredentialSource, SessionStore};
use ow_sync::SyncError;
use serde::Deserialize;
use serde_json::{json, Value};

type Seen = Arc<Mutex<Vec<Option<String>>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str, credentials: Arc<dyn CredentialSource>) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5), credentials)
}

fn auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn reads_decode_backend_payloads() {
    let app = Router::new()
        .route(
            "/",
            get(|| async { Json(json!({"status": "alive", "budget_left": 12.5, "budget_total": 50.0})) }),
        )
        .route(
            "/api/graph",
            get(|| async {
                Json(json!({
                    "tasks": [
                        {"id": "t1", "description": "Plan", "status": "done", "business_value": 8},
                        {"id": "t2", "description": "Build", "status": "cancelled"}
                    ],
                    "dependencies": [{"from_id": "t1", "to_id": "t2"}]
                }))
            }),
        )
        .route(
            "/api/artifacts",
            get(|| async {
                Json(json!([{
                    "id": "a1",
                    "task_id": "t1",
                    "repo_path": "repo/docs/plan.md",
                    "url": "/artifact/a1",
                    "media_type": "text/markdown",
                    "created_at": "2025-01-01T12:00:00.123456",
                    "task_desc": "Plan"
                }]))
            }),
        )
        .route(
            "/backlog",
            get(|| async { Json(json!([{"id": "t2", "description": "Build", "status": "todo"}])) }),
        );
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    let budget = api.budget().await.unwrap();
    assert_eq!(budget.budget_left, 12.5);
    assert_eq!(budget.budget_total, 50.0);

    let graph = api.graph().await.unwrap();
    assert_eq!(graph.tasks.len(), 2);
    assert_eq!(graph.tasks[1].status, TaskStatus::Other("cancelled".into()));
    assert_eq!(graph.dependencies[0].to_id, "t2");

    let artifacts = api.artifacts().await.unwrap();
    assert!(artifacts[0].created_at.is_some());
    assert_eq!(api.resolve_url(&artifacts[0].url), format!("{base}/artifact/a1"));

    let backlog = api.backlog().await.unwrap();
    assert_eq!(backlog[0].status, TaskStatus::Todo);
}

#[tokio::test]
async fn token_is_read_on_every_request() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route(
            "/",
            get(|State(seen): State<Seen>, headers: HeaderMap| async move {
                seen.lock().unwrap().push(auth_header(&headers));
                Json(json!({"budget_left": 1.0, "budget_total": 2.0}))
            }),
        )
        .with_state(seen.clone());
    let base = serve(app).await;

    let session = SessionStore::new();
    let api = client(&base, Arc::new(session.clone()));

    api.budget().await.unwrap();
    session.set_token("first");
    api.budget().await.unwrap();
    session.set_token("rotated");
    api.budget().await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            None,
            Some("Bearer first".to_string()),
            Some("Bearer rotated".to_string()),
        ]
    );
}

#[tokio::test]
async fn read_failure_carries_status_line() {
    let app = Router::new().route(
        "/api/artifacts",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    );
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    let err = api.artifacts().await.unwrap_err();
    assert_eq!(
        err,
        SyncError::Http {
            status: 503,
            reason: "Service Unavailable".into()
        }
    );
    assert_eq!(err.to_string(), "503 Service Unavailable");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let app = Router::new().route("/backlog", get(|| async { Json(json!({"not": "a list"})) }));
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    let err = api.backlog().await.unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{addr}"), Arc::new(Anonymous));
    let err = api.budget().await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn purpose_submission_surfaces_detail() {
    let app = Router::new().route(
        "/api/purpose",
        post(|Json(body): Json<Value>| async move {
            if body["purpose"] == "Ship the launch" {
                (StatusCode::OK, Json(json!({"blueprint": "1. plan\n2. build"})))
            } else {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"detail": "Purpose already has tasks"})),
                )
            }
        }),
    );
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    let blueprint = api.submit_purpose("  Ship the launch ").await.unwrap();
    assert_eq!(blueprint, "1. plan\n2. build");

    let err = api.submit_purpose("Again").await.unwrap_err();
    assert_eq!(
        err,
        SyncError::Rejected {
            status: 400,
            detail: "Purpose already has tasks".into()
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn rejection_without_detail_falls_back_to_status_line() {
    let app = Router::new().route(
        "/api/purpose",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    let err = api.submit_purpose("anything").await.unwrap_err();
    assert_eq!(err.to_string(), "500 Internal Server Error");
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[tokio::test]
async fn login_posts_form_and_returns_token() {
    let app = Router::new().route(
        "/api/login",
        post(|Form(form): Form<LoginForm>| async move {
            if form.username == "admin" && form.password == "hunter2" {
                (StatusCode::OK, Json(json!({"access_token": "tok-123", "token_type": "bearer"})))
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"detail": "Invalid credentials"})),
                )
            }
        }),
    );
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    assert_eq!(api.login("admin", "hunter2").await.unwrap(), "tok-123");
    assert_eq!(api.login("admin", "wrong").await.unwrap_err(), SyncError::LoginFailed);
}

#[tokio::test]
async fn template_round_trip() {
    let stored: Arc<Mutex<Option<String>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/templates/",
            get(|| async { Json(json!(["weekly report", "retro"])) }),
        )
        .route(
            "/api/templates/{name}",
            get(
                |Path(name): Path<String>, State(stored): State<Arc<Mutex<Option<String>>>>| async move {
                    match (name.as_str(), stored.lock().unwrap().clone()) {
                        ("weekly report", Some(content)) => {
                            (StatusCode::OK, Json(json!({"content": content})))
                        }
                        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"}))),
                    }
                },
            )
            .put(
                |Path(name): Path<String>,
                 State(stored): State<Arc<Mutex<Option<String>>>>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(name, "weekly report");
                    *stored.lock().unwrap() = body["content"].as_str().map(str::to_string);
                    Json(json!({"ok": true}))
                },
            ),
        )
        .with_state(stored.clone());
    let base = serve(app).await;
    let api = client(&base, Arc::new(Anonymous));

    assert_eq!(api.list_templates().await.unwrap(), vec!["weekly report", "retro"]);

    let err = api.get_template("weekly report").await.unwrap_err();
    assert_eq!(
        err,
        SyncError::Rejected {
            status: 404,
            detail: "Not Found".into()
        }
    );

    api.save_template("weekly report", "# Week {{n}}").await.unwrap();
    assert_eq!(api.get_template("weekly report").await.unwrap(), "# Week {{n}}");

    assert!(matches!(
        api.save_template("", "x").await,
        Err(SyncError::InvalidInput(_))
    ));
}
