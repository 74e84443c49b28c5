//! Request scope resolution.
//!
//! The gateway does not own the tenant model. A [`RequestScope`] tells it
//! which scope a request belongs to and applies the store switch a
//! verified token asks for.

use axum::http::{Extensions, HeaderMap, HeaderName};

use scopejwt_core::ScopeKey;

/// Default header carrying the request scope, e.g. `website:1`.
pub const SCOPE_HEADER: &str = "x-scope";

/// The store a verified token switched the request to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSwitch {
    /// Store code from the token's `store` claim.
    pub code: String,
}

/// Resolves the tenant scope of a request.
pub trait RequestScope: Send + Sync {
    /// The scope the request belongs to.
    fn scope(&self, headers: &HeaderMap, extensions: &Extensions) -> ScopeKey;

    /// Switch the request to the store named by a token claim.
    fn switch_store(&self, extensions: &mut Extensions, code: &str) {
        extensions.insert(StoreSwitch {
            code: code.to_string(),
        });
    }
}

/// Reads a [`ScopeKey`] request extension set by an earlier layer.
///
/// Requests without one belong to the default scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionScope;

impl RequestScope for ExtensionScope {
    fn scope(&self, _headers: &HeaderMap, extensions: &Extensions) -> ScopeKey {
        extensions.get::<ScopeKey>().copied().unwrap_or_default()
    }
}

/// Reads the scope from a request header, then from an extension.
///
/// Unparseable header values are ignored.
#[derive(Debug, Clone)]
pub struct HeaderScope {
    header: HeaderName,
}

impl HeaderScope {
    /// Read the scope from `header`.
    #[must_use]
    pub const fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for HeaderScope {
    fn default() -> Self {
        Self::new(HeaderName::from_static(SCOPE_HEADER))
    }
}

impl RequestScope for HeaderScope {
    fn scope(&self, headers: &HeaderMap, extensions: &Extensions) -> ScopeKey {
        let from_header = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<ScopeKey>().ok());
        match from_header {
            Some(scope) => scope,
            None => ExtensionScope.scope(headers, extensions),
        }
    }
}
