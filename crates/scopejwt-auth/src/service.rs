//! The token service.
//!
//! [`Service`] owns the scope configuration cache and the collaborators
//! (revocation store, backend resolver, id generator, default error
//! handler). All configuration goes through [`Service::options`]; readers
//! get cloned snapshots, so a configuration is never observed mid-merge.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use scopejwt_core::{ScopeKey, ScopeKind};

use crate::blacklist::{Blacklist, NullBlacklist};
use crate::claims::{Claims, EXPIRES_AT, ISSUED_AT, TOKEN_ID};
use crate::config::{ScopedConfig, DEFAULT_EXPIRATION};
use crate::error::{AuthError, Result};
use crate::handler::{DefaultErrorHandler, ErrorHandler};
use crate::id::{IdGenerator, UuidGenerator};
use crate::key::Key;
use crate::options::{ConfigChange, ServiceOption};
use crate::resolver::ConfigResolver;
use crate::token::{decode_unverified, encode, Header, Token};

#[derive(Clone)]
struct Collaborators {
    blacklist: Arc<dyn Blacklist>,
    resolver: Option<Arc<dyn ConfigResolver>>,
    id_generator: Arc<dyn IdGenerator>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            blacklist: Arc::new(NullBlacklist),
            resolver: None,
            id_generator: Arc::new(UuidGenerator),
            error_handler: Arc::new(DefaultErrorHandler),
        }
    }
}

/// Issues, verifies and revokes tokens for any number of scopes.
pub struct Service {
    scopes: RwLock<HashMap<ScopeKey, ScopedConfig>>,
    collab: RwLock<Collaborators>,
}

impl Service {
    /// Create a service and apply `options` in order.
    ///
    /// The default scope starts with a random HMAC secret signed by fast
    /// HS256, a one hour lifetime and no `jti` claim.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Options`] listing every failed option, or
    /// [`AuthError::IncompleteConfig`] if the default scope ends up unusable.
    pub fn new(options: impl IntoIterator<Item = ServiceOption>) -> Result<Self> {
        let defaults = [
            ConfigChange::Key {
                key: Key::random_hmac(),
                derive_method: true,
            },
            ConfigChange::Expiration(DEFAULT_EXPIRATION),
            ConfigChange::TokenId(false),
        ];
        let default = defaults
            .into_iter()
            .try_fold(ScopedConfig::new(ScopeKey::DEFAULT), |config, change| {
                change.apply(config)
            })?;

        let service = Self {
            scopes: RwLock::new(HashMap::from([(ScopeKey::DEFAULT, default)])),
            collab: RwLock::new(Collaborators::default()),
        };
        service.options(options)?;
        service.scopes.read()[&ScopeKey::DEFAULT].validate()?;
        Ok(service)
    }

    /// Like [`Service::new`] but panics on configuration errors.
    ///
    /// # Panics
    ///
    /// Panics if any option fails.
    #[must_use]
    pub fn must_new(options: impl IntoIterator<Item = ServiceOption>) -> Self {
        match Self::new(options) {
            Ok(service) => service,
            Err(err) => panic!("invalid token service configuration: {err}"),
        }
    }

    /// Apply options to a running service.
    ///
    /// All scope changes are merged under one write lock, so concurrent
    /// readers see either none or all of them. Failing options are
    /// skipped and collected; the others still apply.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Options`] listing every failed option.
    pub fn options(&self, options: impl IntoIterator<Item = ServiceOption>) -> Result<()> {
        let mut errors = Vec::new();
        let mut collab_changes = Vec::new();
        let mut default_handler = None;

        {
            let mut scopes = self.scopes.write();
            for option in options {
                let (scope, change) = match option {
                    ServiceOption::Scoped { scope, change } => (scope, change),
                    other => {
                        collab_changes.push(other);
                        continue;
                    }
                };
                if scope.kind() > ScopeKind::Website {
                    tracing::warn!(scope = %scope, "Rejected option for unsupported scope");
                    errors.push(AuthError::UnsupportedScope(scope));
                    continue;
                }
                if let (true, ConfigChange::ErrorHandler(handler)) = (scope.is_default(), &change) {
                    default_handler = Some(Arc::clone(handler));
                }

                let current = scopes
                    .get(&scope)
                    .cloned()
                    .unwrap_or_else(|| ScopedConfig::new(scope));
                match change.apply(current) {
                    Ok(config) => {
                        scopes.insert(scope, config);
                    }
                    Err(err) => {
                        tracing::warn!(scope = %scope, error = %err, "Configuration option failed");
                        errors.push(err);
                    }
                }
            }
        }

        if !collab_changes.is_empty() || default_handler.is_some() {
            let mut collab = self.collab.write();
            if let Some(handler) = default_handler {
                collab.error_handler = handler;
            }
            for change in collab_changes {
                match change {
                    ServiceOption::Blacklist(blacklist) => collab.blacklist = blacklist,
                    ServiceOption::Resolver(resolver) => collab.resolver = Some(resolver),
                    ServiceOption::IdGenerator(generator) => collab.id_generator = generator,
                    ServiceOption::Scoped { .. } => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Options(errors))
        }
    }

    /// Look up a scope's configuration in the cache.
    ///
    /// A present but incomplete configuration is an error even when
    /// `allow_fallback` is set. An absent one falls back to the default
    /// scope if allowed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::IncompleteConfig`] or [`AuthError::ScopeNotFound`].
    pub fn config_by_scope(&self, scope: ScopeKey, allow_fallback: bool) -> Result<ScopedConfig> {
        let mut config = {
            let scopes = self.scopes.read();
            match scopes.get(&scope) {
                Some(config) if config.is_valid() => config.clone(),
                Some(_) => return Err(AuthError::IncompleteConfig(scope)),
                None if allow_fallback => match scopes.get(&ScopeKey::DEFAULT) {
                    Some(default) if default.is_valid() => default.clone(),
                    _ => return Err(AuthError::ScopeNotFound(scope)),
                },
                None => return Err(AuthError::ScopeNotFound(scope)),
            }
        };

        if config.expire.is_zero() {
            config.expire = self.backfill_expiration(config.scope);
        }
        Ok(config)
    }

    /// Look up a scope's configuration, asking the backend resolver once
    /// on a cache miss.
    ///
    /// The resolver runs without any lock held. Its options are applied and
    /// the cache is consulted exactly once more before falling back.
    ///
    /// # Errors
    ///
    /// As [`Service::config_by_scope`], plus [`AuthError::Resolver`] if the
    /// backend fails or returns options that do not apply.
    pub async fn scoped_config(&self, scope: ScopeKey, allow_fallback: bool) -> Result<ScopedConfig> {
        match self.config_by_scope(scope, false) {
            Err(AuthError::ScopeNotFound(_)) => {}
            found => return found,
        }

        let resolver = self.collab.read().resolver.clone();
        if let Some(resolver) = resolver {
            tracing::debug!(scope = %scope, "Resolving scope configuration from backend");
            let options = resolver
                .resolve(scope)
                .await
                .map_err(|err| resolver_error(scope, err))?;

            if !options.is_empty() {
                self.options(options)
                    .map_err(|err| resolver_error(scope, err))?;
                match self.config_by_scope(scope, false) {
                    Err(AuthError::ScopeNotFound(_)) => {}
                    found => return found,
                }
            }
            tracing::debug!(scope = %scope, "Backend has no configuration for scope");
        }

        self.config_by_scope(scope, allow_fallback)
    }

    /// Issue a token for `scope` carrying `claims`.
    ///
    /// Falls back to the default scope when `scope` is not configured.
    ///
    /// # Errors
    ///
    /// Returns scope resolution errors and signing errors.
    pub async fn new_token(&self, scope: ScopeKey, claims: Claims) -> Result<Token> {
        let config = self.scoped_config(scope, true).await?;
        self.issue(&config, claims)
    }

    /// Issue a token with an already resolved configuration.
    ///
    /// `exp`, `iat` and, when enabled, `jti` are set by the service; the
    /// same names in `claims` or the scope's template are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::IncompleteConfig`] for invalid configurations
    /// and any signing error.
    pub fn issue(&self, config: &ScopedConfig, claims: Claims) -> Result<Token> {
        let (method, _) = config.parts()?;

        let now = Utc::now().timestamp();
        let expire = if config.expire.is_zero() {
            DEFAULT_EXPIRATION
        } else {
            config.expire
        };
        let lifetime = i64::try_from(expire.as_secs()).unwrap_or(i64::MAX);

        let mut all = Claims::new()
            .with(EXPIRES_AT, now.saturating_add(lifetime))
            .with(ISSUED_AT, now);
        if config.enable_jti {
            let id = self.collab.read().id_generator.generate();
            all.set(TOKEN_ID, id);
        }
        let mut dropped = all.merge_unreserved(config.template_claims());
        dropped.extend(all.merge_unreserved(claims));
        if !dropped.is_empty() {
            tracing::debug!(scope = %config.scope, ?dropped, "Ignored reserved claims");
        }

        let header = Header::new(method.alg());
        let raw = encode(method.as_ref(), &config.key, &header, &all)?;
        Ok(Token::verified(header, all, raw))
    }

    /// Verify a token against the default scope.
    ///
    /// # Errors
    ///
    /// As [`Service::parse_scoped`].
    pub async fn parse(&self, raw: &str) -> Result<Token> {
        self.parse_scoped(ScopeKey::DEFAULT, raw).await
    }

    /// Verify a token against `scope`, falling back to the default scope.
    ///
    /// # Errors
    ///
    /// Returns scope resolution errors, or a rejection: malformed token,
    /// wrong algorithm or signature, expired, not yet valid, or revoked.
    pub async fn parse_scoped(&self, scope: ScopeKey, raw: &str) -> Result<Token> {
        let config = self.scoped_config(scope, true).await?;
        self.parse_with_config(&config, raw)
    }

    /// Verify a token with an already resolved configuration.
    ///
    /// Checks run in order: structure, algorithm and signature, `exp` and
    /// `nbf`, then revocation.
    ///
    /// # Errors
    ///
    /// As [`Service::parse_scoped`].
    pub fn parse_with_config(&self, config: &ScopedConfig, raw: &str) -> Result<Token> {
        let (_, verifier) = config.parts()?;
        let raw = raw.trim();
        let unverified = decode_unverified(raw)?;
        verifier.verify(&unverified)?;
        unverified.claims.validate_times(Utc::now().timestamp())?;

        if self.blacklist().has(raw) {
            return Err(AuthError::TokenRevoked);
        }
        Ok(Token::verified(
            unverified.header,
            unverified.claims,
            raw.to_string(),
        ))
    }

    /// Revoke a token until it expires.
    ///
    /// Empty, unverified and already expired tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns the revocation store's error.
    pub fn logout(&self, token: &Token) -> Result<()> {
        if token.raw().is_empty() || !token.is_valid() {
            return Ok(());
        }
        let Some(ttl) = token.remaining_ttl() else {
            return Ok(());
        };
        tracing::debug!(ttl_secs = ttl.as_secs(), "Revoking token");
        self.blacklist().set(token.raw(), ttl)
    }

    /// The error handler for `scope`, or the service-wide one.
    #[must_use]
    pub fn error_handler_for(&self, scope: ScopeKey) -> Arc<dyn ErrorHandler> {
        let scoped = self
            .scopes
            .read()
            .get(&scope)
            .and_then(|config| config.error_handler.clone());
        scoped.unwrap_or_else(|| Arc::clone(&self.collab.read().error_handler))
    }

    /// The revocation store.
    #[must_use]
    pub fn blacklist(&self) -> Arc<dyn Blacklist> {
        Arc::clone(&self.collab.read().blacklist)
    }

    /// Scopes with a cached configuration, coarsest first.
    #[must_use]
    pub fn configured_scopes(&self) -> Vec<ScopeKey> {
        let mut scopes: Vec<_> = self.scopes.read().keys().copied().collect();
        scopes.sort();
        scopes
    }

    fn backfill_expiration(&self, scope: ScopeKey) -> Duration {
        let mut scopes = self.scopes.write();
        let fallback = scopes
            .get(&ScopeKey::DEFAULT)
            .map(ScopedConfig::expire)
            .filter(|expire| !expire.is_zero())
            .unwrap_or(DEFAULT_EXPIRATION);
        match scopes.get_mut(&scope) {
            Some(config) if config.expire.is_zero() => {
                config.expire = fallback;
                fallback
            }
            Some(config) => config.expire,
            None => fallback,
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("scopes", &self.configured_scopes())
            .field("resolver", &self.collab.read().resolver.is_some())
            .finish_non_exhaustive()
    }
}

fn resolver_error(scope: ScopeKey, err: AuthError) -> AuthError {
    match err {
        AuthError::Resolver { .. } => err,
        other => AuthError::Resolver {
            scope,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{with_expiration, with_key, with_raw_key, with_token_id};

    #[test]
    fn default_scope_is_ready() {
        let service = Service::new([]).unwrap();
        let config = service.config_by_scope(ScopeKey::DEFAULT, false).unwrap();
        assert!(config.is_valid());
        assert_eq!(config.expire(), DEFAULT_EXPIRATION);
        assert!(!config.token_id_enabled());
        assert!(config.signing_method().unwrap().binds_key());
    }

    #[test]
    fn option_errors_are_collected() {
        let err = Service::new([
            with_key(ScopeKey::website(1), Key::hmac([0u8; 4])),
            with_key(ScopeKey::website(2), Key::private_pem(b"nope", None)),
            with_expiration(ScopeKey::store(3), Duration::from_secs(1)),
        ])
        .unwrap_err();

        let AuthError::Options(errors) = err else {
            panic!("expected collected errors");
        };
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], AuthError::KeyTooShort { .. }));
        assert!(matches!(errors[1], AuthError::KeyParse(_)));
        assert!(matches!(errors[2], AuthError::UnsupportedScope(_)));
    }

    #[test]
    #[should_panic(expected = "invalid token service configuration")]
    fn must_new_panics() {
        let _ = Service::must_new([with_key(ScopeKey::DEFAULT, Key::hmac(b""))]);
    }

    #[test]
    fn incomplete_scope_does_not_fall_back() {
        let scope = ScopeKey::website(1);
        let service = Service::new([with_raw_key(scope, Key::hmac([1u8; 32]))]).unwrap();
        assert!(matches!(
            service.config_by_scope(scope, true),
            Err(AuthError::IncompleteConfig(s)) if s == scope
        ));
    }

    #[test]
    fn zero_expiry_is_backfilled() {
        let scope = ScopeKey::website(1);
        let service = Service::new([
            with_expiration(ScopeKey::DEFAULT, Duration::from_secs(90)),
            with_key(scope, Key::hmac([1u8; 32])),
        ])
        .unwrap();

        assert_eq!(
            service.config_by_scope(scope, false).unwrap().expire(),
            Duration::from_secs(90)
        );
        assert_eq!(
            service.scopes.read()[&scope].expire(),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn issue_sets_reserved_claims() {
        let service = Service::new([with_token_id(ScopeKey::DEFAULT, true)]).unwrap();
        let config = service.config_by_scope(ScopeKey::DEFAULT, false).unwrap();
        let token = service
            .issue(&config, Claims::new().with(TOKEN_ID, "mine").with(EXPIRES_AT, 1))
            .unwrap();

        let exp = token.claims.expires_at().unwrap();
        let iat = token.claims.issued_at().unwrap();
        assert_eq!(exp - iat, 3600);
        assert_ne!(token.claims.id(), Some("mine"));
        assert!(token.claims.id().is_some());
        assert!(token.is_valid());
    }

    #[test]
    fn configured_scopes_are_sorted() {
        let service = Service::new([
            with_key(ScopeKey::website(2), Key::hmac([1u8; 32])),
            with_key(ScopeKey::website(1), Key::hmac([1u8; 32])),
        ])
        .unwrap();
        assert_eq!(
            service.configured_scopes(),
            vec![ScopeKey::DEFAULT, ScopeKey::website(1), ScopeKey::website(2)]
        );
    }
}
