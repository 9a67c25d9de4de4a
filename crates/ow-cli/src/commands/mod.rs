pub mod graph;
pub mod login;
pub mod purpose;
pub mod status;
pub mod task;
pub mod templates;
pub mod watch;

use std::sync::Arc;

use ow_core::config::Config;
use ow_sync::aggregator::SnapshotAggregator;
use ow_sync::client::ApiClient;
use ow_sync::session::{ChainedCredentials, CredentialSource, EnvCredentials, TokenFile};
use ow_sync::store::ViewModel;
use ow_sync::SyncError;

/// Everything a subcommand needs: the resolved config and where the login
/// token lives.
pub struct AppContext {
    pub config: Config,
    pub token_file: TokenFile,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            token_file: TokenFile::new(Config::token_path()),
        }
    }

    /// `$token_env` first, then the token stored by `orgwatch login`.
    pub fn credentials(&self) -> Arc<dyn CredentialSource> {
        Arc::new(
            ChainedCredentials::new()
                .with(EnvCredentials::new(&self.config.api.token_env))
                .with(self.token_file.clone()),
        )
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::from_config(&self.config.api, self.credentials())
    }

    pub fn aggregator(&self) -> SnapshotAggregator {
        SnapshotAggregator::new(Arc::new(self.client()), self.config.sync.task_source)
    }

    /// One refresh cycle, outside of any scheduler.
    pub async fn snapshot(&self) -> anyhow::Result<ViewModel> {
        self.aggregator()
            .refresh()
            .await
            .map_err(|e| friendly_error(e, &self.config.api.base_url))
    }
}

/// Map sync errors to user-friendly messages.
pub fn friendly_error(err: SyncError, base_url: &str) -> anyhow::Error {
    match err {
        SyncError::Network(msg) => anyhow::anyhow!(
            "Could not reach the orgwatch backend at {base_url}.\n  \
             (hint: is it running? check --api-url or [api].base_url)\n  \
             cause: {msg}"
        ),
        SyncError::Partial { endpoint, source } => {
            let cause = friendly_error(*source, base_url);
            anyhow::anyhow!("{cause}\n  while reading {endpoint}")
        }
        SyncError::Http { status: 401, .. } | SyncError::Rejected { status: 401, .. } => {
            anyhow::anyhow!("Not authorized. Run `orgwatch login <username>` first.")
        }
        SyncError::LoginFailed => anyhow::anyhow!("Login failed: check username and password."),
        SyncError::Rejected { detail, .. } => anyhow::anyhow!("{detail}"),
        other => anyhow::anyhow!("API request failed: {other}"),
    }
}
