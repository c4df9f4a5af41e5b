use std::sync::Arc;

use hurl_index::PackageIndex;
use hurl_repo::PackageRepo;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub repo: PackageRepo,
    pub index: Arc<PackageIndex>,
    pub log_limit: usize,
}

impl AppState {
    pub fn new(repo: PackageRepo, index: Arc<PackageIndex>, config: &ServerConfig) -> Self {
        Self {
            repo,
            index,
            log_limit: config.log_limit,
        }
    }

    /// Run a blocking repository or index read off the async executor.
    pub async fn blocking<T, F>(&self, f: F) -> ServerResult<T>
    where
        F: FnOnce(&Self) -> ServerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?
    }
}
