//! Request extractors for authenticated routes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use scopejwt_auth::Token;
use scopejwt_core::ScopeKey;

use crate::error::ApiError;
use crate::state::GatewayState;

/// The verified token of the current request.
///
/// Only available behind the [`require_token`](crate::middleware::require_token)
/// middleware; elsewhere extraction fails with 401.
#[derive(Debug, Clone)]
pub struct AuthToken(pub Token);

#[async_trait]
impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Token>()
            .cloned()
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}

/// The scope the request belongs to, as seen by the gateway's
/// [`RequestScope`](crate::scope::RequestScope).
#[derive(Debug, Clone, Copy)]
pub struct RequestedScope(pub ScopeKey);

#[async_trait]
impl FromRequestParts<Arc<GatewayState>> for RequestedScope {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.scope.scope(&parts.headers, &parts.extensions)))
    }
}
