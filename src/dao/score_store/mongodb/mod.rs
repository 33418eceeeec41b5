mod config;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoScoreStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        if err.is_permission_denied() {
            return StorageError::PermissionDenied {
                message: err.to_string(),
            };
        }
        if err.is_duplicate_key() {
            return StorageError::Rejected {
                message: err.to_string(),
            };
        }
        StorageError::unavailable(err.to_string(), err)
    }
}
