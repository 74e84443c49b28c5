//! Bearer token middleware.
//!
//! [`require_token`] guards a router: it resolves the request scope,
//! looks up that scope's configuration, verifies the bearer token and
//! hands the request on with the token attached. Failures never reach
//! the downstream handler; they go to the scope's error handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use scopejwt_auth::AuthError;
use scopejwt_core::ScopeKey;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Query parameter checked when no `Authorization` header is present.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Extract a bearer token from the `Authorization` header or the
/// `access_token` query parameter.
///
/// The scheme is matched case-insensitively; blank tokens count as absent.
#[must_use]
pub fn extract_bearer(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().ok()?.trim();
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        return (!token.is_empty()).then(|| token.to_string());
    }

    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(ACCESS_TOKEN_PARAM)
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authenticate a request before running the rest of the stack.
///
/// On success the verified [`Token`](scopejwt_auth::Token) is inserted
/// as a request extension and a `store` claim switches the request's
/// store through the gateway's [`RequestScope`](crate::scope::RequestScope).
pub async fn require_token(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let scope = state.scope.scope(request.headers(), request.extensions());

    let config = match state.service.scoped_config(scope, true).await {
        Ok(config) => config,
        Err(err) => return reject(&state, scope, &err),
    };

    let Some(raw) = extract_bearer(request.headers(), request.uri()) else {
        return reject(&state, scope, &AuthError::MissingToken);
    };

    let token = match state.service.parse_with_config(&config, &raw) {
        Ok(token) => token,
        Err(err) => return reject(&state, scope, &err),
    };

    if let Some(code) = token.store_code() {
        tracing::debug!(scope = %scope, store = code, "Switching store from token claim");
        state.scope.switch_store(request.extensions_mut(), code);
    }
    request.extensions_mut().insert(token);

    next.run(request).await
}

fn reject(state: &GatewayState, scope: ScopeKey, err: &AuthError) -> Response {
    match err.rejection() {
        Some(reason) => {
            tracing::warn!(scope = %scope, reason = ?reason, error = %err, "Rejected bearer token");
        }
        None => {
            tracing::error!(scope = %scope, error = %err, "Authentication failed before token check");
        }
    }
    let handler = state.service.error_handler_for(scope);
    ApiError::from(handler.handle(scope, err)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    fn uri(value: &str) -> Uri {
        value.parse().unwrap()
    }

    #[test]
    fn reads_bearer_header() {
        assert_eq!(
            extract_bearer(&headers("Bearer abc.def.ghi"), &uri("/")),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(
            extract_bearer(&headers("bearer   abc"), &uri("/")),
            Some("abc".to_string())
        );
    }

    #[test]
    fn other_schemes_are_ignored() {
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw=="), &uri("/")), None);
        assert_eq!(extract_bearer(&headers("Bearer "), &uri("/")), None);
        assert_eq!(extract_bearer(&headers("Bearer"), &uri("/")), None);
    }

    #[test]
    fn falls_back_to_query() {
        assert_eq!(
            extract_bearer(&HeaderMap::new(), &uri("/ws?access_token=abc.def&x=1")),
            Some("abc.def".to_string())
        );
        assert_eq!(extract_bearer(&HeaderMap::new(), &uri("/ws?access_token=")), None);
        assert_eq!(extract_bearer(&HeaderMap::new(), &uri("/ws")), None);
    }

    #[test]
    fn header_wins_over_query() {
        assert_eq!(
            extract_bearer(&headers("Bearer header"), &uri("/?access_token=query")),
            Some("header".to_string())
        );
    }
}
