//! HTTP gateway for the scoped token service.
//!
//! This crate hosts [`scopejwt_auth::Service`] behind axum. It provides:
//!
//! - The [`require_token`] middleware for protected routes
//! - Extractors for the verified token and the request scope
//! - A pluggable [`RequestScope`] that maps requests to tenant scopes
//! - Demo routes to issue, revoke and inspect tokens
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │          (Authorization: Bearer / ?access_token=)           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     scopejwt-gateway                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │ RequestScope│ │ require_    │ │  Router + Handlers  │    │
//! │  │             │ │ token       │ │                     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                       ┌──────────────┐
//!                       │ scopejwt-auth│
//!                       │   Service    │
//!                       └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scopejwt_auth::Service;
//! use scopejwt_gateway::{create_router, GatewayConfig, GatewayState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::default();
//! let service = Arc::new(Service::new(config.auth.options())?);
//!
//! let app = create_router(GatewayState::new(service, config));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod scope;
pub mod state;

pub use config::{AuthSettings, ConfigError, GatewayConfig, RevocationMode, WebsiteOverride};
pub use error::ApiError;
pub use middleware::{extract_bearer, require_token};
pub use routes::create_router;
pub use scope::{ExtensionScope, HeaderScope, RequestScope, StoreSwitch, SCOPE_HEADER};
pub use state::GatewayState;

// Re-export key types for convenience
pub use auth::{AuthToken, RequestedScope};
