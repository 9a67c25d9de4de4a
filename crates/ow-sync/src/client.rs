//! Async HTTP client for the orgwatch backend.
//!
//! Read paths map a non-2xx response to [`SyncError::Http`]; write paths map
//! it to [`SyncError::Rejected`] carrying the backend's `detail` message.
//! The bearer token is looked up on every request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ow_api_types::{
    Artifact, BudgetSnapshot, ErrorDetail, GraphPayload, LoginResponse, PurposeRequest,
    PurposeResponse, Task, TemplateContent,
};
use ow_core::config::ApiConfig;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{
    DashboardBackend, ARTIFACTS_PATH, BACKLOG_PATH, BUDGET_PATH, GRAPH_PATH, LOGIN_PATH,
    PURPOSE_PATH, TEMPLATES_PATH,
};
use crate::error::{Result, SyncError};
use crate::session::CredentialSource;

/// Reusable client + base URL + credential source.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
    credentials: Arc<dyn CredentialSource>,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration, credentials: Arc<dyn CredentialSource>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default http client");
                reqwest::Client::new()
            });
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn from_config(api: &ApiConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        Self::new(&api.base_url, api.timeout(), credentials)
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Artifact urls are served relative to the backend (`/artifact/{id}`);
    /// absolute urls pass through unchanged.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            self.url(url)
        } else {
            format!("{}/{}", self.base, url)
        }
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.credentials.bearer_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    // -- request helpers ----------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .authorize(self.client.get(self.url(path)))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(path, status = status.as_u16(), "read rejected");
            return Err(SyncError::http(status));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a write request and return the raw success response.
    async fn send_write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let mut req = self
            .authorize(self.client.request(method.clone(), self.url(path)))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let bytes = resp.bytes().await.unwrap_or_default();
        let detail = rejection_detail(status, &bytes);
        tracing::debug!(%method, path, status = status.as_u16(), %detail, "write rejected");
        Err(SyncError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn write_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let resp = self.send_write(method, path, body).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // -- write endpoints ----------------------------------------------------

    /// `POST /api/purpose`; returns the generated blueprint.
    pub async fn submit_purpose(&self, purpose: &str) -> Result<String> {
        let purpose = purpose.trim();
        if purpose.is_empty() {
            return Err(SyncError::InvalidInput("purpose must not be empty".into()));
        }
        let body = PurposeRequest {
            purpose: purpose.to_string(),
        };
        let resp: PurposeResponse = self
            .write_json(Method::POST, PURPOSE_PATH, Some(&body))
            .await?;
        Ok(resp.blueprint)
    }

    /// `POST /api/login` with a form body; returns the access token.
    ///
    /// Every failure status collapses into [`SyncError::LoginFailed`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let resp = self
            .client
            .post(self.url(LOGIN_PATH))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        if !resp.status().is_success() {
            tracing::debug!(status = resp.status().as_u16(), "login rejected");
            return Err(SyncError::LoginFailed);
        }
        let bytes = resp.bytes().await?;
        let login: LoginResponse = serde_json::from_slice(&bytes)?;
        Ok(login.access_token)
    }

    /// `GET /api/templates/`
    pub async fn list_templates(&self) -> Result<Vec<String>> {
        self.write_json::<(), _>(Method::GET, &format!("{TEMPLATES_PATH}/"), None)
            .await
    }

    /// `GET /api/templates/{name}`
    pub async fn get_template(&self, name: &str) -> Result<String> {
        let path = template_path(name)?;
        let resp: TemplateContent = self.write_json::<(), _>(Method::GET, &path, None).await?;
        Ok(resp.content)
    }

    /// `PUT /api/templates/{name}`. The response body is not inspected;
    /// backends answer with either the saved content or a bare ack.
    pub async fn save_template(&self, name: &str, content: &str) -> Result<()> {
        let path = template_path(name)?;
        let body = TemplateContent {
            content: content.to_string(),
        };
        self.send_write(Method::PUT, &path, Some(&body)).await?;
        tracing::debug!(name, bytes = content.len(), "template saved");
        Ok(())
    }
}

#[async_trait]
impl DashboardBackend for ApiClient {
    async fn budget(&self) -> Result<BudgetSnapshot> {
        self.get_json(BUDGET_PATH).await
    }

    async fn backlog(&self) -> Result<Vec<Task>> {
        self.get_json(BACKLOG_PATH).await
    }

    async fn graph(&self) -> Result<GraphPayload> {
        self.get_json(GRAPH_PATH).await
    }

    async fn artifacts(&self) -> Result<Vec<Artifact>> {
        self.get_json(ARTIFACTS_PATH).await
    }
}

fn template_path(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyncError::InvalidInput("template name must not be empty".into()));
    }
    Ok(format!("{TEMPLATES_PATH}/{}", urlencoding::encode(name)))
}

/// The backend's `detail` message, or the status line when the body has none.
fn rejection_detail(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorDetail>(body)
        .ok()
        .and_then(|d| d.message())
        .unwrap_or_else(|| SyncError::http(status).to_string())
}
