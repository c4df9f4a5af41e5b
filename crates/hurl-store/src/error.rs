use crate::object::{ObjectId, ObjectKind};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The id resolved to an object of a different kind than requested.
    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A string or byte slice is not a valid object id.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// The repository could not be opened.
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// Error reported by libgit2.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding shared backend state was poisoned.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` if this error means "the id exists but is the wrong
    /// kind of object", e.g. a blob where a tree was expected.
    pub fn is_unexpected_kind(&self) -> bool {
        matches!(self, Self::UnexpectedKind { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
