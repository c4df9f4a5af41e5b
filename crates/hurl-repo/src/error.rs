//! Error types for repository operations.

use hurl_manifest::ManifestError;
use hurl_store::StoreError;
use thiserror::Error;

/// Errors that can occur while reading the repository.
///
/// Absent branches, packages and files are not errors; they come back as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The object store failed or holds a corrupt object.
    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    /// A package's Cakefile could not be interpreted.
    #[error("malformed manifest for {branch}/{package}: {source}")]
    Manifest {
        branch: String,
        package: String,
        #[source]
        source: ManifestError,
    },
}

impl RepoError {
    pub fn manifest(branch: &str, package: &str, source: ManifestError) -> Self {
        Self::Manifest {
            branch: branch.to_string(),
            package: package.to_string(),
            source,
        }
    }

    /// Returns `true` for manifest errors, which bulk callers skip.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Manifest { .. })
    }
}

/// Convenience type alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
