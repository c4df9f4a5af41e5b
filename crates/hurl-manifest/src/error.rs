//! Error types for manifest parsing.

use thiserror::Error;

/// Errors produced while parsing or interpreting a Cakefile.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The blob is not valid YAML.
    #[error("malformed manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed, but its root is not a mapping.
    #[error("malformed manifest: expected a mapping at the root, found {found}")]
    NotAMapping { found: &'static str },

    /// A field holds a value of the wrong shape.
    #[error("field {field:?}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A field required by the operation is absent.
    #[error("missing required field {0:?}")]
    MissingField(String),

    /// A source entry has a shape that cannot be normalized.
    #[error("unsupported source shape: {shape}")]
    UnsupportedSource { shape: &'static str },
}

/// Convenience alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;
