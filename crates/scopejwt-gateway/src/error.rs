//! API error types and responses.
//!
//! Every error body has the shape `{"error": {"code": .., "message": ..}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use scopejwt_auth::{AuthError, ErrorClass, ErrorResponse, REJECTED_MESSAGE};

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid authentication token.
    #[error("{}", REJECTED_MESSAGE)]
    Unauthorized,

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// A response built by a scope's error handler.
    #[error("{}", .0.message)]
    Handled(ErrorResponse),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Handled(response) => {
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
            Self::Handled(response) => response.code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = match self {
            Self::Handled(response) => response.message,
            other => other.to_string(),
        };

        let body = ErrorEnvelope {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ErrorResponse> for ApiError {
    fn from(response: ErrorResponse) -> Self {
        Self::Handled(response)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.class() {
            ErrorClass::Cryptographic | ErrorClass::Revoked => Self::Unauthorized,
            ErrorClass::Configuration | ErrorClass::Scope | ErrorClass::Storage => {
                tracing::error!(error = %err, "Auth internal error");
                Self::Internal("authentication service error".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopejwt_core::ScopeKey;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::BadRequest("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn handled_responses_keep_their_status() {
        let err = ApiError::from(ErrorResponse {
            status: 418,
            code: "teapot",
            message: "short and stout".into(),
        });
        assert_eq!(err.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(err.code(), "teapot");

        let bogus = ApiError::from(ErrorResponse {
            status: 1000,
            code: "bogus",
            message: String::new(),
        });
        assert_eq!(bogus.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_errors_do_not_leak_details() {
        assert!(matches!(
            ApiError::from(AuthError::TokenRevoked),
            ApiError::Unauthorized
        ));
        let err = ApiError::from(AuthError::ScopeNotFound(ScopeKey::website(3)));
        assert!(!err.to_string().contains("website"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
