use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Success envelope shared by every JSON route: `{success: true, data, warning?}`.
///
/// Failures are rendered by [`crate::error::AppError`] as `{success: false, error}`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    /// Set when the request succeeded only partially.
    pub warning: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            warning: None,
        }
    }

    pub fn with_warning(data: T, warning: Option<String>) -> Self {
        Self {
            success: true,
            data,
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_is_omitted_when_absent() {
        let value = serde_json::to_value(ApiResponse::ok(3)).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "data": 3}));

        let value =
            serde_json::to_value(ApiResponse::with_warning(3, Some("partial".into()))).unwrap();
        assert_eq!(value["warning"], "partial");
    }
}
