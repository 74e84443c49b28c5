//! Scopejwt Gateway - HTTP host for the scoped token service
//!
//! This is the main entry point for the gateway service. It loads
//! [`GatewayConfig`] from `CONFIG_PATH` and the environment, builds the
//! token service and serves the demo API.
//!
//! `POST /v1/tokens` mints tokens for unauthenticated callers and is only
//! routed with `ENABLE_TOKEN_ENDPOINT=true`. Leave it off outside
//! development; production tokens come from [`scopejwt_auth::Service`]
//! inside the host application.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scopejwt_auth::Service;
use scopejwt_gateway::{create_router, GatewayConfig, GatewayState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scopejwt=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Scopejwt Gateway");

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        algorithm = %config.auth.algorithm,
        expire_seconds = config.auth.expire_seconds,
        revocation = ?config.auth.revocation,
        websites = config.auth.websites.len(),
        "Gateway configuration loaded"
    );

    if config.token_endpoint {
        tracing::warn!("Token endpoint enabled - any caller can mint tokens, use for development only");
    }
    if config.auth.key_path.is_none() && config.auth.hmac_secret.is_none() {
        tracing::warn!("No signing key configured - tokens will not survive a restart");
    }

    let service = Arc::new(Service::new(config.auth.options())?);
    tracing::info!(
        scopes = service.configured_scopes().len(),
        "Token service initialized"
    );

    let listen_addr = config.listen_addr.clone();
    let state = GatewayState::new(service, config);
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
