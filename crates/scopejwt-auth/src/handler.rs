//! Error handlers.
//!
//! An [`ErrorHandler`] decides what a caller sees when authentication
//! fails. It is transport neutral: it returns an [`ErrorResponse`] which
//! the HTTP layer turns into a real response.

use scopejwt_core::ScopeKey;

use crate::error::{AuthError, ErrorClass};

/// Generic message for every token rejection.
pub const REJECTED_MESSAGE: &str = "token not valid or blacklisted";

/// What to send back for a failed authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub status: u16,
    /// Machine readable code.
    pub code: &'static str,
    /// Human readable message.
    pub message: String,
}

/// Turns authentication failures into responses.
pub trait ErrorHandler: Send + Sync {
    /// Build the response for `error` raised while serving `scope`.
    fn handle(&self, scope: ScopeKey, error: &AuthError) -> ErrorResponse;
}

impl<F> ErrorHandler for F
where
    F: Fn(ScopeKey, &AuthError) -> ErrorResponse + Send + Sync,
{
    fn handle(&self, scope: ScopeKey, error: &AuthError) -> ErrorResponse {
        self(scope, error)
    }
}

/// The handler used when a scope configures none.
///
/// Rejections all produce the same 401 body, so a caller cannot tell a
/// bad signature from a revoked or expired token. Configuration and
/// scope failures produce a 500 without details.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, _scope: ScopeKey, error: &AuthError) -> ErrorResponse {
        match error.class() {
            ErrorClass::Cryptographic | ErrorClass::Revoked => ErrorResponse {
                status: 401,
                code: "unauthorized",
                message: REJECTED_MESSAGE.to_string(),
            },
            ErrorClass::Configuration | ErrorClass::Scope | ErrorClass::Storage => ErrorResponse {
                status: 500,
                code: "internal_error",
                message: "authentication service error".to_string(),
            },
        }
    }
}
