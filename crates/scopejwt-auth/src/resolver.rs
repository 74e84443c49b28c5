//! Backend configuration resolvers.
//!
//! A [`ConfigResolver`] supplies options for scopes the service has not
//! seen yet. The service calls it at most once per cache miss, outside
//! its locks, so a slow backend only delays requests for that scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use scopejwt_core::ScopeKey;

use crate::error::Result;
use crate::options::ServiceOption;

/// Looks up configuration options for a scope.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    /// Options that configure `scope`.
    ///
    /// An empty list means the backend knows nothing about the scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn resolve(&self, scope: ScopeKey) -> Result<Vec<ServiceOption>>;
}

/// A resolver backed by a fixed table of options.
///
/// Counts its calls, which makes the retry bound observable.
#[derive(Debug, Default)]
pub struct StaticResolver {
    scopes: HashMap<ScopeKey, Vec<ServiceOption>>,
    calls: AtomicUsize,
}

impl StaticResolver {
    /// A resolver that knows no scopes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the options returned for `scope`.
    #[must_use]
    pub fn with_scope(mut self, scope: ScopeKey, options: Vec<ServiceOption>) -> Self {
        self.scopes.entry(scope).or_default().extend(options);
        self
    }

    /// Number of `resolve` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConfigResolver for StaticResolver {
    async fn resolve(&self, scope: ScopeKey) -> Result<Vec<ServiceOption>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.scopes.get(&scope).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::options::with_expiration;

    #[tokio::test]
    async fn returns_options_for_known_scopes() {
        let scope = ScopeKey::website(3);
        let resolver = StaticResolver::new()
            .with_scope(scope, vec![with_expiration(scope, Duration::from_secs(60))]);

        assert_eq!(resolver.resolve(scope).await.unwrap().len(), 1);
        assert!(resolver.resolve(ScopeKey::website(4)).await.unwrap().is_empty());
        assert_eq!(resolver.calls(), 2);
    }
}
