use std::sync::Arc;

use hurl_index::PackageIndex;
use hurl_repo::PackageRepo;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The hurl HTTP server.
pub struct HurlServer {
    config: ServerConfig,
    state: AppState,
}

impl HurlServer {
    pub fn new(config: ServerConfig, repo: PackageRepo, index: Arc<PackageIndex>) -> Self {
        let state = AppState::new(repo, index, &config);
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving. Runs until the listener fails.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("hurl server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
