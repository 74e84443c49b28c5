//! Authentication error types.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use scopejwt_core::ScopeKey;
use thiserror::Error;

use crate::algorithm::Algorithm;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// The broad class an [`AuthError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Key material, algorithm or scope configuration is wrong or incomplete.
    Configuration,
    /// The token failed decoding, signature or time checks.
    Cryptographic,
    /// The token verified but is listed in the revocation store.
    Revoked,
    /// No usable configuration exists for the requested scope.
    Scope,
    /// The revocation store failed.
    Storage,
}

/// Why a presented token was refused.
///
/// Used for server-side logging; responses do not reveal it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a structurally valid token.
    Malformed,
    /// The signature or declared algorithm does not match the scope.
    Signature,
    /// The `exp` claim has elapsed.
    Expired,
    /// The `nbf` claim lies in the future.
    NotYetValid,
    /// The token was revoked.
    Revoked,
}

/// Errors that can occur while configuring scopes or handling tokens.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The algorithm name is not one of the supported signing algorithms.
    #[error("unknown signing algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The key material is empty.
    #[error("key material is empty")]
    EmptyKey,

    /// The HMAC secret is shorter than the digest size.
    #[error("HMAC key for {alg} must be at least {min} bytes, got {got}")]
    KeyTooShort {
        /// The HMAC algorithm.
        alg: Algorithm,
        /// The minimum secret length.
        min: usize,
        /// The supplied secret length.
        got: usize,
    },

    /// The PEM block is encrypted and no password was supplied.
    #[error("private key is password protected but no password was supplied")]
    PasswordRequired,

    /// The password did not decrypt the PEM block.
    #[error("private key password is wrong")]
    WrongPassword,

    /// The key file could not be read.
    #[error("failed to read key file {}: {source}", path.display())]
    KeyFile {
        /// The path that was read.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The key material could not be parsed.
    #[error("failed to parse key: {0}")]
    KeyParse(String),

    /// The key type or curve is not usable for token signing.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// The key family does not fit the signing algorithm.
    #[error("key cannot be used with {0}")]
    KeyMismatch(Algorithm),

    /// A scope has a partial configuration without key or signing method.
    #[error("scope {0} is missing a signing method and key")]
    IncompleteConfig(ScopeKey),

    /// A configuration option targets a scope finer than a website.
    #[error("scope {0} is not supported, only default and website scopes can be configured")]
    UnsupportedScope(ScopeKey),

    /// One or more configuration options failed.
    #[error("{}", OptionErrors(.0))]
    Options(Vec<AuthError>),

    /// No configuration exists for the scope and no fallback applies.
    #[error("no configuration found for scope {0}")]
    ScopeNotFound(ScopeKey),

    /// The backend resolver failed for a scope.
    #[error("backend configuration for scope {scope} failed: {message}")]
    Resolver {
        /// The scope being resolved.
        scope: ScopeKey,
        /// What went wrong.
        message: String,
    },

    /// No token was presented.
    #[error("missing bearer token")]
    MissingToken,

    /// The token is not a structurally valid JWT.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token declares a different algorithm than the scope uses.
    #[error("token algorithm {got} does not match expected {expected}")]
    AlgorithmMismatch {
        /// The algorithm configured for the scope.
        expected: Algorithm,
        /// The algorithm declared in the token header.
        got: String,
    },

    /// The token signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The token is not valid yet.
    #[error("token not valid yet")]
    TokenNotYetValid,

    /// The token has been revoked.
    #[error("token revoked")]
    TokenRevoked,

    /// A signing operation failed inside the crypto library.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The revocation store rejected a write.
    #[error("revocation store error: {0}")]
    Blacklist(String),
}

impl AuthError {
    /// Returns the class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownAlgorithm(_)
            | Self::EmptyKey
            | Self::KeyTooShort { .. }
            | Self::PasswordRequired
            | Self::WrongPassword
            | Self::KeyFile { .. }
            | Self::KeyParse(_)
            | Self::UnsupportedKey(_)
            | Self::KeyMismatch(_)
            | Self::IncompleteConfig(_)
            | Self::UnsupportedScope(_)
            | Self::Options(_)
            | Self::Crypto(_) => ErrorClass::Configuration,
            Self::MissingToken
            | Self::Malformed(_)
            | Self::AlgorithmMismatch { .. }
            | Self::InvalidSignature
            | Self::TokenExpired
            | Self::TokenNotYetValid => ErrorClass::Cryptographic,
            Self::TokenRevoked => ErrorClass::Revoked,
            Self::ScopeNotFound(_) | Self::Resolver { .. } => ErrorClass::Scope,
            Self::Blacklist(_) => ErrorClass::Storage,
        }
    }

    /// Returns the rejection reason when this error refuses a presented token.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::MissingToken | Self::Malformed(_) => Some(Rejection::Malformed),
            Self::AlgorithmMismatch { .. } | Self::InvalidSignature => Some(Rejection::Signature),
            Self::TokenExpired => Some(Rejection::Expired),
            Self::TokenNotYetValid => Some(Rejection::NotYetValid),
            Self::TokenRevoked => Some(Rejection::Revoked),
            _ => None,
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Cryptographic | ErrorClass::Revoked => 401,
            ErrorClass::Configuration | ErrorClass::Scope | ErrorClass::Storage => 500,
        }
    }
}

struct OptionErrors<'a>(&'a [AuthError]);

impl fmt::Display for OptionErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{err}")?;
        }
        Ok(())
    }
}
