//! Error types shared by the PostgREST storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`PostgrestDaoError`] failures.
pub type PostgrestResult<T> = Result<T, PostgrestDaoError>;

/// Postgres SQLSTATE raised when a row-level security policy refuses a row.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Failures that can occur while interacting with the PostgREST API.
#[derive(Debug, Error)]
pub enum PostgrestDaoError {
    /// Required environment variable is missing.
    #[error("missing PostgREST environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build PostgREST client")]
    ClientBuilder {
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// A request to a table endpoint could not be sent.
    #[error("failed to send PostgREST request to `{path}`")]
    RequestSend {
        /// Table endpoint involved.
        path: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// PostgREST answered with an error status.
    #[error("PostgREST returned {status} for `{path}`: {message}")]
    Api {
        /// Table endpoint involved.
        path: String,
        /// HTTP status of the response.
        status: StatusCode,
        /// Postgres error code, when the API reported one.
        code: Option<String>,
        /// Message reported by the API.
        message: String,
    },
    /// Response payload could not be parsed into the expected rows.
    #[error("failed to decode PostgREST response for `{path}`")]
    DecodeResponse {
        /// Table endpoint involved.
        path: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// A write answered without the row it was asked to return.
    #[error("PostgREST response for `{path}` did not contain the written row")]
    MissingRow { path: String },
}

impl PostgrestDaoError {
    /// True when the API refused the request because of row-level security or missing grants.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            PostgrestDaoError::Api {
                status,
                code,
                message,
                ..
            } => {
                matches!(*status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
                    || code.as_deref() == Some(INSUFFICIENT_PRIVILEGE)
                    || message.contains("row-level security policy")
            }
            _ => false,
        }
    }

    /// Message reported by the API, when the failure came from it.
    pub fn api_message(&self) -> Option<String> {
        match self {
            PostgrestDaoError::Api { message, .. } => Some(message.clone()),
            _ => None,
        }
    }

    /// Message of a request the API rejected as invalid (4xx), surfaced verbatim to callers.
    pub fn rejection_message(&self) -> Option<String> {
        match self {
            PostgrestDaoError::Api {
                status, message, ..
            } if status.is_client_error() => Some(message.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: StatusCode, code: Option<&str>, message: &str) -> PostgrestDaoError {
        PostgrestDaoError::Api {
            path: "scores".into(),
            status,
            code: code.map(str::to_owned),
            message: message.into(),
        }
    }

    #[test]
    fn row_level_security_failures_are_permission_denied() {
        assert!(
            api(
                StatusCode::BAD_REQUEST,
                Some("42501"),
                "new row violates row-level security policy for table \"scores\""
            )
            .is_permission_denied()
        );
        assert!(api(StatusCode::UNAUTHORIZED, None, "JWT expired").is_permission_denied());
        assert!(
            !api(StatusCode::CONFLICT, Some("23505"), "duplicate key").is_permission_denied()
        );
    }

    #[test]
    fn client_errors_are_rejections_and_server_errors_are_not() {
        assert_eq!(
            api(StatusCode::CONFLICT, Some("23503"), "violates foreign key").rejection_message(),
            Some("violates foreign key".into())
        );
        assert_eq!(
            api(StatusCode::BAD_GATEWAY, None, "upstream down").rejection_message(),
            None
        );
    }
}
