//! Configuration options.
//!
//! A [`ServiceOption`] either changes one field of one scope's
//! configuration or swaps a service collaborator. Scope changes are
//! [`ConfigChange`] values whose [`ConfigChange::apply`] is a pure
//! `ScopedConfig -> ScopedConfig` step, so merge behaviour can be tested
//! without a service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use scopejwt_core::ScopeKey;

use crate::algorithm::{Algorithm, KeyFamily};
use crate::blacklist::Blacklist;
use crate::config::{ClaimsTemplate, ScopedConfig};
use crate::error::{AuthError, Result};
use crate::handler::ErrorHandler;
use crate::id::IdGenerator;
use crate::key::Key;
use crate::resolver::ConfigResolver;
use crate::signing::{default_for_key, for_algorithm, HmacFast, SigningMethod};

/// A change to a single field of a scope's configuration.
#[derive(Clone)]
pub enum ConfigChange {
    /// Replace the key material.
    ///
    /// With `derive_method` set, a scope without a signing method, or with
    /// one the new key cannot serve, gets the key's default method.
    /// Without it, a method the key cannot serve is an error.
    Key {
        /// The new key.
        key: Key,
        /// Derive a signing method if none fits.
        derive_method: bool,
    },
    /// Replace the signing method.
    SigningMethod(Arc<dyn SigningMethod>),
    /// Replace the signing method by algorithm name.
    SigningMethodName(String),
    /// Replace the token lifetime.
    Expiration(Duration),
    /// Toggle the `jti` claim.
    TokenId(bool),
    /// Replace the error handler.
    ErrorHandler(Arc<dyn ErrorHandler>),
    /// Replace the claims template.
    Template(ClaimsTemplate),
}

impl ConfigChange {
    /// Overlay this change on `config`, leaving every other field alone.
    ///
    /// The verifier is rebuilt whenever the key or signing method changes.
    ///
    /// # Errors
    ///
    /// Returns the key's construction error for faulted keys,
    /// [`AuthError::UnknownAlgorithm`] for unknown names, and
    /// [`AuthError::KeyMismatch`] or [`AuthError::KeyTooShort`] when a
    /// signing method cannot be served by the configured key.
    pub fn apply(self, mut config: ScopedConfig) -> Result<ScopedConfig> {
        match self {
            Self::Key { key, derive_method } => {
                if let Some(err) = key.error() {
                    return Err(err.clone());
                }
                let method = match config.signing_method.take() {
                    None if derive_method => Some(default_for_key(&key)?),
                    None => None,
                    Some(method) if fits(&key, method.alg()) => {
                        if method.binds_key() {
                            Some(rebind(method.alg(), &key)?)
                        } else {
                            check_fit(&key, method.alg())?;
                            Some(method)
                        }
                    }
                    Some(method) if derive_method => {
                        let derived = default_for_key(&key)?;
                        tracing::debug!(
                            scope = %config.scope,
                            from = %method.alg(),
                            to = %derived.alg(),
                            "Key change replaced signing method"
                        );
                        Some(derived)
                    }
                    Some(method) => return Err(AuthError::KeyMismatch(method.alg())),
                };
                config.key = key;
                config.signing_method = method;
                config.rebuild_verifier();
            }
            Self::SigningMethod(method) => {
                check_fit(&config.key, method.alg())?;
                config.signing_method = Some(method);
                config.rebuild_verifier();
            }
            Self::SigningMethodName(name) => {
                let alg: Algorithm = name.parse()?;
                check_fit(&config.key, alg)?;
                let method = if config.key.family() == Some(KeyFamily::Hmac) {
                    rebind(alg, &config.key)?
                } else {
                    for_algorithm(alg)
                };
                config.signing_method = Some(method);
                config.rebuild_verifier();
            }
            Self::Expiration(expire) => config.expire = expire,
            Self::TokenId(enabled) => config.enable_jti = enabled,
            Self::ErrorHandler(handler) => config.error_handler = Some(handler),
            Self::Template(template) => config.template = Some(template),
        }
        Ok(config)
    }
}

impl fmt::Debug for ConfigChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { key, derive_method } => f
                .debug_struct("Key")
                .field("key", key)
                .field("derive_method", derive_method)
                .finish(),
            Self::SigningMethod(method) => f.debug_tuple("SigningMethod").field(method).finish(),
            Self::SigningMethodName(name) => f.debug_tuple("SigningMethodName").field(name).finish(),
            Self::Expiration(expire) => f.debug_tuple("Expiration").field(expire).finish(),
            Self::TokenId(enabled) => f.debug_tuple("TokenId").field(enabled).finish(),
            Self::ErrorHandler(_) => f.write_str("ErrorHandler(..)"),
            Self::Template(_) => f.write_str("Template(..)"),
        }
    }
}

fn rebind(alg: Algorithm, key: &Key) -> Result<Arc<dyn SigningMethod>> {
    Ok(Arc::new(HmacFast::new(alg, key)?))
}

/// Whether `key` can serve `alg` at all: same family and, for ECDSA,
/// the same curve. A key without material fits anything.
fn fits(key: &Key, alg: Algorithm) -> bool {
    match key.family() {
        None => true,
        Some(KeyFamily::Hmac) => alg.family() == KeyFamily::Hmac,
        Some(_) => key.check_family(alg).is_ok(),
    }
}

/// Like [`fits`], also rejecting HMAC secrets too short for `alg`.
fn check_fit(key: &Key, alg: Algorithm) -> Result<()> {
    if !fits(key, alg) {
        return Err(AuthError::KeyMismatch(alg));
    }
    if key.family() == Some(KeyFamily::Hmac) {
        HmacFast::new(alg, key)?;
    }
    Ok(())
}

/// One unit of service configuration.
#[derive(Clone)]
pub enum ServiceOption {
    /// Change a field of one scope.
    Scoped {
        /// The scope to change.
        scope: ScopeKey,
        /// The change.
        change: ConfigChange,
    },
    /// Replace the revocation store.
    Blacklist(Arc<dyn Blacklist>),
    /// Attach a backend resolver for unconfigured scopes.
    Resolver(Arc<dyn ConfigResolver>),
    /// Replace the `jti` generator.
    IdGenerator(Arc<dyn IdGenerator>),
}

impl ServiceOption {
    /// The scope a scoped option targets.
    #[must_use]
    pub const fn scope(&self) -> Option<ScopeKey> {
        match self {
            Self::Scoped { scope, .. } => Some(*scope),
            _ => None,
        }
    }
}

impl fmt::Debug for ServiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scoped { scope, change } => f
                .debug_struct("Scoped")
                .field("scope", scope)
                .field("change", change)
                .finish(),
            Self::Blacklist(_) => f.write_str("Blacklist(..)"),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
            Self::IdGenerator(_) => f.write_str("IdGenerator(..)"),
        }
    }
}

const fn scoped(scope: ScopeKey, change: ConfigChange) -> ServiceOption {
    ServiceOption::Scoped { scope, change }
}

/// Set the key of `scope`, deriving the key family's default signing
/// method if the scope has none.
#[must_use]
pub fn with_key(scope: ScopeKey, key: Key) -> ServiceOption {
    scoped(
        scope,
        ConfigChange::Key {
            key,
            derive_method: true,
        },
    )
}

/// Set the key of `scope` without deriving a signing method.
#[must_use]
pub fn with_raw_key(scope: ScopeKey, key: Key) -> ServiceOption {
    scoped(
        scope,
        ConfigChange::Key {
            key,
            derive_method: false,
        },
    )
}

/// Set the signing method of `scope`. Apply after [`with_key`] to override
/// the derived method.
#[must_use]
pub fn with_signing_method(scope: ScopeKey, method: Arc<dyn SigningMethod>) -> ServiceOption {
    scoped(scope, ConfigChange::SigningMethod(method))
}

/// Set the signing method of `scope` by algorithm name, e.g. `"ES384"`.
#[must_use]
pub fn with_signing_method_name(scope: ScopeKey, name: impl Into<String>) -> ServiceOption {
    scoped(scope, ConfigChange::SigningMethodName(name.into()))
}

/// Set the token lifetime of `scope`.
#[must_use]
pub fn with_expiration(scope: ScopeKey, expire: Duration) -> ServiceOption {
    scoped(scope, ConfigChange::Expiration(expire))
}

/// Enable or disable the `jti` claim for `scope`.
#[must_use]
pub fn with_token_id(scope: ScopeKey, enabled: bool) -> ServiceOption {
    scoped(scope, ConfigChange::TokenId(enabled))
}

/// Set the error handler of `scope`. On the default scope it also becomes
/// the service-wide handler.
#[must_use]
pub fn with_error_handler(scope: ScopeKey, handler: Arc<dyn ErrorHandler>) -> ServiceOption {
    scoped(scope, ConfigChange::ErrorHandler(handler))
}

/// Set the claims every new token of `scope` starts from.
#[must_use]
pub fn with_template(scope: ScopeKey, template: ClaimsTemplate) -> ServiceOption {
    scoped(scope, ConfigChange::Template(template))
}

/// Use `blacklist` as the revocation store.
#[must_use]
pub fn with_blacklist(blacklist: Arc<dyn Blacklist>) -> ServiceOption {
    ServiceOption::Blacklist(blacklist)
}

/// Resolve unconfigured scopes through `resolver`.
#[must_use]
pub fn with_backend(resolver: Arc<dyn ConfigResolver>) -> ServiceOption {
    ServiceOption::Resolver(resolver)
}

/// Generate `jti` values with `generator`.
#[must_use]
pub fn with_id_generator(generator: Arc<dyn IdGenerator>) -> ServiceOption {
    ServiceOption::IdGenerator(generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Claims;

    fn website() -> ScopeKey {
        ScopeKey::website(1)
    }

    fn apply_all(changes: Vec<ConfigChange>) -> Result<ScopedConfig> {
        changes
            .into_iter()
            .try_fold(ScopedConfig::new(website()), |config, change| {
                change.apply(config)
            })
    }

    fn key_change(key: Key) -> ConfigChange {
        ConfigChange::Key {
            key,
            derive_method: true,
        }
    }

    #[test]
    fn key_derives_default_method() {
        let config = apply_all(vec![key_change(Key::hmac([1u8; 48]))]).unwrap();
        assert!(config.is_valid());
        let method = config.signing_method().unwrap();
        assert_eq!(method.alg(), Algorithm::HS256);
        assert!(method.binds_key());
    }

    #[test]
    fn raw_key_leaves_config_incomplete() {
        let config = apply_all(vec![ConfigChange::Key {
            key: Key::hmac([1u8; 32]),
            derive_method: false,
        }])
        .unwrap();
        assert!(!config.is_valid());
        assert!(matches!(config.validate(), Err(AuthError::IncompleteConfig(_))));
    }

    #[test]
    fn later_method_overrides_derived_one() {
        let config = apply_all(vec![
            key_change(Key::hmac([1u8; 64])),
            ConfigChange::SigningMethodName("HS512".into()),
        ])
        .unwrap();
        assert_eq!(config.verifier().unwrap().algorithm(), Algorithm::HS512);
    }

    #[test]
    fn method_before_key_is_kept() {
        let config = apply_all(vec![
            ConfigChange::SigningMethodName("ES384".into()),
            key_change(Key::generate_ecdsa(Algorithm::ES384)),
        ])
        .unwrap();
        assert!(config.is_valid());
        assert_eq!(config.verifier().unwrap().algorithm(), Algorithm::ES384);
    }

    #[test]
    fn key_change_rebinds_fast_hmac() {
        let config = apply_all(vec![
            key_change(Key::hmac([1u8; 32])),
            key_change(Key::hmac([2u8; 32])),
        ])
        .unwrap();
        let method = config.signing_method().unwrap();
        let expected = crate::signing::for_algorithm(Algorithm::HS256)
            .sign(b"input", &Key::hmac([2u8; 32]))
            .unwrap();
        assert_eq!(method.sign(b"input", config.key()).unwrap(), expected);
    }

    #[test]
    fn faulted_key_fails() {
        let err = apply_all(vec![key_change(Key::private_pem(b"garbage", None))]).unwrap_err();
        assert!(matches!(err, AuthError::KeyParse(_)));
    }

    #[test]
    fn short_hmac_secret_fails_once_at_configuration() {
        let err = apply_all(vec![key_change(Key::hmac([1u8; 8]))]).unwrap_err();
        assert!(matches!(err, AuthError::KeyTooShort { min: 32, got: 8, .. }));
    }

    #[test]
    fn family_mismatch_fails() {
        let err = apply_all(vec![
            key_change(Key::hmac([1u8; 32])),
            ConfigChange::SigningMethodName("RS256".into()),
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::KeyMismatch(Algorithm::RS256)));
    }

    #[test]
    fn key_of_other_family_replaces_bound_hmac() {
        let config = apply_all(vec![
            key_change(Key::hmac([1u8; 64])),
            key_change(Key::generate_rsa(2048)),
        ])
        .unwrap();
        assert!(config.is_valid());
        assert_eq!(config.verifier().unwrap().algorithm(), Algorithm::RS256);

        let config = ConfigChange::SigningMethodName("RS512".into())
            .apply(config)
            .unwrap();
        assert_eq!(config.verifier().unwrap().algorithm(), Algorithm::RS512);
    }

    #[test]
    fn ecdsa_key_replaces_rsa_method() {
        let config = apply_all(vec![
            key_change(Key::generate_rsa(2048)),
            ConfigChange::SigningMethodName("RS384".into()),
            key_change(Key::generate_ecdsa(Algorithm::ES384)),
        ])
        .unwrap();
        assert_eq!(config.verifier().unwrap().algorithm(), Algorithm::ES384);
        let method = config.signing_method().unwrap();
        assert!(method.sign(b"input", config.key()).is_ok());
    }

    #[test]
    fn raw_key_of_other_family_fails() {
        let err = apply_all(vec![
            key_change(Key::generate_rsa(2048)),
            ConfigChange::Key {
                key: Key::generate_ecdsa(Algorithm::ES256),
                derive_method: false,
            },
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::KeyMismatch(Algorithm::RS256)));
    }

    #[test]
    fn curve_mismatch_fails() {
        let err = apply_all(vec![
            key_change(Key::generate_ecdsa(Algorithm::ES256)),
            ConfigChange::SigningMethodName("ES384".into()),
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::KeyMismatch(Algorithm::ES384)));

        let err = apply_all(vec![
            key_change(Key::generate_ecdsa(Algorithm::ES256)),
            ConfigChange::SigningMethod(crate::signing::for_algorithm(Algorithm::ES512)),
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::KeyMismatch(Algorithm::ES512)));
    }

    #[test]
    fn short_secret_for_explicit_method_fails() {
        let err = apply_all(vec![
            key_change(Key::hmac([1u8; 32])),
            ConfigChange::SigningMethod(crate::signing::for_algorithm(Algorithm::HS512)),
        ])
        .unwrap_err();
        assert!(matches!(err, AuthError::KeyTooShort { min: 64, got: 32, .. }));
    }

    #[test]
    fn unknown_algorithm_fails() {
        let err = apply_all(vec![ConfigChange::SigningMethodName("none".into())]).unwrap_err();
        assert!(matches!(err, AuthError::UnknownAlgorithm(name) if name == "none"));
    }

    #[test]
    fn fields_merge_without_replacing() {
        let config = apply_all(vec![
            key_change(Key::hmac([1u8; 32])),
            ConfigChange::Expiration(Duration::from_secs(300)),
            ConfigChange::TokenId(true),
            ConfigChange::Template(Arc::new(|| Claims::new().with("iss", "shop"))),
        ])
        .unwrap();
        assert!(config.is_valid());
        assert_eq!(config.expire(), Duration::from_secs(300));
        assert!(config.token_id_enabled());
        assert_eq!(config.template_claims().get_str("iss"), Some("shop"));
    }

    #[test]
    fn repeated_expiration_is_idempotent() {
        let once = apply_all(vec![
            key_change(Key::hmac([1u8; 32])),
            ConfigChange::Expiration(Duration::from_secs(300)),
        ])
        .unwrap();
        let twice = ConfigChange::Expiration(Duration::from_secs(300))
            .apply(once.clone())
            .unwrap();
        assert_eq!(format!("{once:?}"), format!("{twice:?}"));
    }

    #[test]
    fn option_helpers_target_scope() {
        assert_eq!(with_token_id(website(), true).scope(), Some(website()));
        assert_eq!(
            with_blacklist(Arc::new(crate::blacklist::NullBlacklist)).scope(),
            None
        );
    }
}
