use authz::AuthzError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// API Error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Authz(#[from] AuthzError),
}

/// Error response structure for OpenAPI documentation
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authz(err) => match err {
                AuthzError::Remote { .. } => StatusCode::BAD_GATEWAY,
                AuthzError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
                AuthzError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::Authz(err) => match err {
                AuthzError::Validation(_) => "VALIDATION_ERROR",
                AuthzError::Unsupported(_) => "UNSUPPORTED",
                AuthzError::NotEnoughLayer(_) => "NOT_ENOUGH_LAYER",
                AuthzError::TypeMismatch(_) => "TYPE_MISMATCH",
                AuthzError::InvalidPolicy(_) => "INVALID_POLICY",
                AuthzError::ParamInvalid(_) => "PARAM_INVALID",
                AuthzError::Remote { .. } => "REMOTE_ERROR",
                AuthzError::Cancelled { .. } => "CANCELLED",
                AuthzError::Store(_) => "STORE_ERROR",
            },
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Authz(AuthzError::Remote { rid, .. })
            | ApiError::Authz(AuthzError::Cancelled { rid }) => {
                Some(serde_json::json!({ "rid": rid }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let error_response = ApiErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AuthzError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AuthzError::NotEnoughLayer("x".into()), StatusCode::BAD_REQUEST),
            (AuthzError::remote("rid", "down"), StatusCode::BAD_GATEWAY),
            (
                AuthzError::Cancelled { rid: "rid".into() },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (AuthzError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_remote_error_carries_rid() {
        let err = ApiError::from(AuthzError::remote("abc", "down"));
        assert_eq!(err.error_code(), "REMOTE_ERROR");
        assert_eq!(err.details(), Some(serde_json::json!({"rid": "abc"})));
    }
}
