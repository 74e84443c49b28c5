//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use scopejwt_auth::Service;

use crate::config::GatewayConfig;
use crate::scope::{HeaderScope, RequestScope};

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    /// The token service.
    pub service: Arc<Service>,
    /// Resolves the scope of each request.
    pub scope: Arc<dyn RequestScope>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Create a new gateway state reading scopes from the `x-scope` header.
    #[must_use]
    pub fn new(service: Arc<Service>, config: GatewayConfig) -> Self {
        Self {
            service,
            scope: Arc::new(HeaderScope::default()),
            config,
        }
    }

    /// Replace the scope resolver.
    #[must_use]
    pub fn with_scope(mut self, scope: Arc<dyn RequestScope>) -> Self {
        self.scope = scope;
        self
    }
}
