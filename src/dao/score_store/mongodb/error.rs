use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code returned when the authenticated user lacks a privilege.
const UNAUTHORIZED: i32 = 13;
/// Server error code returned on unique index violations.
const DUPLICATE_KEY: i32 = 11000;

/// Failures of the MongoDB score store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable is not set.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Connection string as given.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings sent before giving up.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Connecting was configured with zero attempts.
    #[error("MongoDB connection was configured with zero attempts")]
    NoConnectAttempts,
    /// A health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection involved.
        collection: &'static str,
        /// Indexed fields.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A read failed.
    #[error("failed to query collection `{collection}`")]
    Query {
        /// Collection involved.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A write failed.
    #[error("failed to write to collection `{collection}`")]
    Write {
        /// Collection involved.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A stored document does not map to an entity.
    #[error("invalid document `{id}` in collection `{collection}`: {kind}")]
    InvalidDocument {
        /// Collection involved.
        collection: &'static str,
        /// Identifier of the offending document.
        id: String,
        /// What is wrong with it.
        kind: &'static str,
    },
}

impl MongoDaoError {
    fn server_code(&self) -> Option<i32> {
        let source = match self {
            MongoDaoError::Query { source, .. } | MongoDaoError::Write { source, .. } => source,
            _ => return None,
        };

        match source.kind.as_ref() {
            ErrorKind::Command(command) => Some(command.code),
            ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
            _ => None,
        }
    }

    /// True when the server refused the operation for lack of privileges.
    pub fn is_permission_denied(&self) -> bool {
        self.server_code() == Some(UNAUTHORIZED)
    }

    /// True when a unique index rejected the write.
    pub fn is_duplicate_key(&self) -> bool {
        self.server_code() == Some(DUPLICATE_KEY)
    }
}
