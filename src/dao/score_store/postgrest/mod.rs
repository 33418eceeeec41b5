mod config;
mod error;
mod models;
mod store;

pub use config::PostgrestConfig;
pub use error::PostgrestDaoError;
pub use store::PostgrestScoreStore;

use crate::dao::storage::StorageError;

impl From<PostgrestDaoError> for StorageError {
    fn from(err: PostgrestDaoError) -> Self {
        if err.is_permission_denied() {
            return StorageError::PermissionDenied {
                message: err.api_message().unwrap_or_else(|| err.to_string()),
            };
        }
        if let Some(message) = err.rejection_message() {
            return StorageError::Rejected { message };
        }
        StorageError::unavailable(err.to_string(), err)
    }
}
