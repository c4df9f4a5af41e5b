//! Error types for the search index.

use std::path::PathBuf;

use hurl_repo::RepoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The search engine failed (I/O, corrupt segment, lock held, ...).
    #[error("search engine error: {0}")]
    Engine(#[from] tantivy::TantivyError),

    /// Reading the repository failed.
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    /// No index exists at the configured location yet.
    #[error("no index at {0}; create it first")]
    NotCreated(PathBuf),

    /// An existing index lacks a field this version expects.
    #[error("index schema mismatch: missing field {0:?}")]
    SchemaMismatch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index lock poisoned")]
    LockPoisoned,
}

pub type IndexResult<T> = Result<T, IndexError>;
