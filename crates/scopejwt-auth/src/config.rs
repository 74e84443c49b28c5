//! Per-scope configuration.
//!
//! A [`ScopedConfig`] starts empty, is filled field by field by
//! [`ConfigChange`](crate::options::ConfigChange)s and becomes valid once
//! it holds key material, a signing method and the verifier derived from
//! both. Invalid configurations never issue or accept tokens.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use scopejwt_core::ScopeKey;

use crate::algorithm::Algorithm;
use crate::claims::Claims;
use crate::error::{AuthError, Result};
use crate::handler::ErrorHandler;
use crate::key::Key;
use crate::signing::SigningMethod;
use crate::token::Unverified;

/// Expiry used when a scope sets none.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Builds the base claims every new token of a scope starts from.
pub type ClaimsTemplate = Arc<dyn Fn() -> Claims + Send + Sync>;

/// Maps a decoded token to the method and key it must verify with.
///
/// Refuses tokens whose `alg` header names anything but the bound
/// method's algorithm, so a token signed with one family is never
/// checked under another.
#[derive(Clone)]
pub struct Verifier {
    method: Arc<dyn SigningMethod>,
    key: Key,
}

impl Verifier {
    pub(crate) fn new(method: Arc<dyn SigningMethod>, key: Key) -> Self {
        Self { method, key }
    }

    /// The only algorithm this verifier accepts.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.method.alg()
    }

    /// Verify the signature of a decoded token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AlgorithmMismatch`] if the header names another
    /// algorithm and [`AuthError::InvalidSignature`] if the signature fails.
    pub fn verify(&self, token: &Unverified<'_>) -> Result<()> {
        let expected = self.method.alg();
        if token.header.alg != expected.as_str() {
            return Err(AuthError::AlgorithmMismatch {
                expected,
                got: token.header.alg.clone(),
            });
        }
        self.method
            .verify(token.signing_input.as_bytes(), &token.signature, &self.key)
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("alg", &self.method.alg())
            .finish_non_exhaustive()
    }
}

/// Configuration bundle for one scope.
#[derive(Clone)]
pub struct ScopedConfig {
    pub(crate) scope: ScopeKey,
    pub(crate) key: Key,
    pub(crate) signing_method: Option<Arc<dyn SigningMethod>>,
    pub(crate) verifier: Option<Verifier>,
    pub(crate) expire: Duration,
    pub(crate) enable_jti: bool,
    pub(crate) error_handler: Option<Arc<dyn ErrorHandler>>,
    pub(crate) template: Option<ClaimsTemplate>,
}

impl ScopedConfig {
    /// An empty configuration for `scope`.
    #[must_use]
    pub fn new(scope: ScopeKey) -> Self {
        Self {
            scope,
            key: Key::default(),
            signing_method: None,
            verifier: None,
            expire: Duration::ZERO,
            enable_jti: false,
            error_handler: None,
            template: None,
        }
    }

    /// The scope this configuration belongs to.
    #[must_use]
    pub const fn scope(&self) -> ScopeKey {
        self.scope
    }

    /// The key material.
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// The signing method, if set.
    #[must_use]
    pub fn signing_method(&self) -> Option<&Arc<dyn SigningMethod>> {
        self.signing_method.as_ref()
    }

    /// The derived verifier, if the configuration is complete enough.
    #[must_use]
    pub const fn verifier(&self) -> Option<&Verifier> {
        self.verifier.as_ref()
    }

    /// Token lifetime. Zero means "not set".
    #[must_use]
    pub const fn expire(&self) -> Duration {
        self.expire
    }

    /// Whether new tokens get a `jti` claim.
    #[must_use]
    pub const fn token_id_enabled(&self) -> bool {
        self.enable_jti
    }

    /// The scope's error handler, if set.
    #[must_use]
    pub fn error_handler(&self) -> Option<&Arc<dyn ErrorHandler>> {
        self.error_handler.as_ref()
    }

    /// Base claims for a new token.
    #[must_use]
    pub fn template_claims(&self) -> Claims {
        self.template.as_ref().map(|t| t()).unwrap_or_default()
    }

    /// Returns `true` when the configuration can issue and verify tokens.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.key.is_empty()
            && self.key.error().is_none()
            && self.signing_method.is_some()
            && self.verifier.is_some()
    }

    /// Fail loudly unless the configuration is valid.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::IncompleteConfig`] naming the scope.
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(AuthError::IncompleteConfig(self.scope))
        }
    }

    /// The signing method and verifier of a valid configuration.
    pub(crate) fn parts(&self) -> Result<(&Arc<dyn SigningMethod>, &Verifier)> {
        self.validate()?;
        match (&self.signing_method, &self.verifier) {
            (Some(method), Some(verifier)) => Ok((method, verifier)),
            _ => Err(AuthError::IncompleteConfig(self.scope)),
        }
    }

    /// Rebuild the verifier from the current method and key.
    pub(crate) fn rebuild_verifier(&mut self) {
        self.verifier = match &self.signing_method {
            Some(method) if !self.key.is_empty() => {
                Some(Verifier::new(Arc::clone(method), self.key.clone()))
            }
            _ => None,
        };
    }
}

impl fmt::Debug for ScopedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConfig")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .field("signing_method", &self.signing_method)
            .field("verifier", &self.verifier)
            .field("expire", &self.expire)
            .field("enable_jti", &self.enable_jti)
            .field("error_handler", &self.error_handler.is_some())
            .field("template", &self.template.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::for_algorithm;
    use crate::token::{decode_unverified, encode, Header};

    fn complete(alg: Algorithm, key: Key) -> ScopedConfig {
        let mut config = ScopedConfig::new(ScopeKey::website(1));
        config.key = key;
        config.signing_method = Some(for_algorithm(alg));
        config.rebuild_verifier();
        config
    }

    #[test]
    fn empty_config_is_invalid() {
        let config = ScopedConfig::new(ScopeKey::website(1));
        assert!(!config.is_valid());
        assert!(matches!(
            config.validate(),
            Err(AuthError::IncompleteConfig(scope)) if scope == ScopeKey::website(1)
        ));
    }

    #[test]
    fn key_without_method_is_invalid() {
        let mut config = ScopedConfig::new(ScopeKey::website(1));
        config.key = Key::hmac([1u8; 32]);
        config.rebuild_verifier();
        assert!(config.verifier().is_none());
        assert!(!config.is_valid());
    }

    #[test]
    fn complete_config_is_valid() {
        let config = complete(Algorithm::HS256, Key::hmac([1u8; 32]));
        assert!(config.is_valid());
        assert_eq!(config.verifier().unwrap().algorithm(), Algorithm::HS256);
    }

    #[test]
    fn verifier_refuses_other_algorithms() {
        let key = Key::hmac([1u8; 64]);
        let signed_with = for_algorithm(Algorithm::HS512);
        let raw = encode(
            signed_with.as_ref(),
            &key,
            &Header::new(Algorithm::HS512),
            &Claims::new(),
        )
        .unwrap();

        let config = complete(Algorithm::HS256, key);
        let token = decode_unverified(&raw).unwrap();
        assert!(matches!(
            config.verifier().unwrap().verify(&token),
            Err(AuthError::AlgorithmMismatch { expected: Algorithm::HS256, got }) if got == "HS512"
        ));
    }

    #[test]
    fn template_defaults_to_empty() {
        let mut config = ScopedConfig::new(ScopeKey::DEFAULT);
        assert!(config.template_claims().is_empty());
        config.template = Some(Arc::new(|| Claims::new().with("iss", "shop")));
        assert_eq!(config.template_claims().get_str("iss"), Some("shop"));
    }
}
