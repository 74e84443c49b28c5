//! Token endpoints.
//!
//! Issue, revoke and inspect tokens for the scope of the request.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scopejwt_auth::Claims;

use crate::auth::{AuthToken, RequestedScope};
use crate::error::ApiError;
use crate::scope::StoreSwitch;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to issue a token.
#[derive(Debug, Default, Deserialize)]
pub struct IssueTokenBody {
    /// Claims to carry. `exp`, `iat` and `jti` are set by the service.
    #[serde(default)]
    pub claims: Claims,
}

/// Response for an issued token.
#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    /// The compact token.
    pub token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Expiry of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// The scope the token was requested for.
    pub scope: String,
}

/// Response describing the caller's token.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    /// The scope the request was authenticated against.
    pub scope: String,
    /// Verified claims.
    pub claims: Claims,
    /// Store the token switched the request to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Issue a token for the request scope.
///
/// Unconfigured scopes are served by the default scope. Routed only when
/// [`GatewayConfig::token_endpoint`](crate::GatewayConfig::token_endpoint)
/// is set, since the caller is not authenticated.
///
/// # Example
///
/// ```text
/// POST /v1/tokens
/// x-scope: website:1
/// {"claims": {"sub": "42", "store": "de"}}
///
/// Response: 201 Created
/// {
///   "token": "eyJhbGciOi...",
///   "token_type": "Bearer",
///   "expires_at": "2026-01-01T01:00:00Z",
///   "scope": "website:1"
/// }
/// ```
pub async fn issue_token(
    State(state): State<Arc<GatewayState>>,
    RequestedScope(scope): RequestedScope,
    Json(body): Json<IssueTokenBody>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.service.new_token(scope, body.claims).await?;
    tracing::info!(scope = %scope, "Issued token");

    let response = IssueTokenResponse {
        expires_at: token.expires_at(),
        token: token.raw().to_string(),
        token_type: "Bearer",
        scope: scope.to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Revoke the bearer token of the request.
pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    AuthToken(token): AuthToken,
) -> Result<StatusCode, ApiError> {
    state.service.logout(&token)?;
    tracing::info!(jti = ?token.claims.id(), "Token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// Echo the verified claims of the request.
pub async fn whoami(
    RequestedScope(scope): RequestedScope,
    AuthToken(token): AuthToken,
    store: Option<Extension<StoreSwitch>>,
) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        scope: scope.to_string(),
        claims: token.claims,
        store: store.map(|Extension(switch)| switch.code),
    })
}
