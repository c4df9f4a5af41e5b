//! Error types for the index listener.

use hurl_index::IndexError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenError {
    /// A message could not be decoded into a notification.
    #[error("malformed notification {text:?}: {reason}")]
    Malformed { text: String, reason: String },

    /// Applying a notification to the index failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// The notification channel failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel's receiving end is gone.
    #[error("notification channel closed")]
    Closed,

    /// A blocking index task panicked or was cancelled.
    #[error("index task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ListenError {
    pub fn malformed(text: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ListenResult<T> = Result<T, ListenError>;
