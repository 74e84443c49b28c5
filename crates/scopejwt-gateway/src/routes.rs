//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, tokens};
use crate::middleware::require_token;
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/tokens` - Issue a token for the request scope, only with
///   [`GatewayConfig::token_endpoint`](crate::GatewayConfig::token_endpoint) set
///
/// ## Authenticated
/// - `POST /v1/logout` - Revoke the bearer token
/// - `GET /v1/whoami` - Echo the verified claims
pub fn create_router(state: GatewayState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();
    let token_endpoint = state.config.token_endpoint;

    let state = Arc::new(state);

    let protected = Router::new()
        .route("/v1/logout", post(tokens::logout))
        .route("/v1/whoami", get(tokens::whoami))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_token));

    let mut public = Router::new().route("/health", get(health::health));
    if token_endpoint {
        public = public.route("/v1/tokens", post(tokens::issue_token));
    }

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
