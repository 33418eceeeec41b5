use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or answered something unreadable.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable description.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The store refused the write for lack of permission (row-level security).
    #[error("{message}")]
    PermissionDenied { message: String },
    /// The store rejected the request itself, e.g. a constraint violation.
    #[error("{message}")]
    Rejected { message: String },
    /// The configured backend was not compiled into this binary.
    #[error("storage backend `{backend}` is not enabled in this build")]
    Unsupported { backend: &'static str },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// True when the failure is a permission refusal.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StorageError::PermissionDenied { .. })
    }
}
