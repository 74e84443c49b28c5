//! Supported JWS signing algorithms.

use std::fmt;
use std::str::FromStr;

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The algorithm family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Shared secret.
    Hmac,
    /// RSA key pair.
    Rsa,
    /// Elliptic curve key pair.
    Ecdsa,
}

/// JWS signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// `HMAC` using `SHA-256`
    HS256,
    /// `HMAC` using `SHA-384`
    HS384,
    /// `HMAC` using `SHA-512`
    HS512,
    /// `RSASSA-PKCS1-v1_5` using `SHA-256`
    RS256,
    /// `RSASSA-PKCS1-v1_5` using `SHA-384`
    RS384,
    /// `RSASSA-PKCS1-v1_5` using `SHA-512`
    RS512,
    /// `ECDSA` using `P-256` and `SHA-256`
    ES256,
    /// `ECDSA` using `P-384` and `SHA-384`
    ES384,
    /// `ECDSA` using `P-521` and `SHA-512`
    ES512,
}

impl Algorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 9] = [
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    /// The name used in the JWT `alg` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    /// The key family this algorithm signs with.
    #[must_use]
    pub const fn family(self) -> KeyFamily {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => KeyFamily::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 => KeyFamily::Ecdsa,
        }
    }

    /// Digest output size in bytes, which is also the minimum HMAC secret length.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::HS256 | Self::RS256 | Self::ES256 => 32,
            Self::HS384 | Self::RS384 | Self::ES384 => 48,
            Self::HS512 | Self::RS512 | Self::ES512 => 64,
        }
    }

    pub(crate) fn digest(self) -> MessageDigest {
        match self.digest_len() {
            32 => MessageDigest::sha256(),
            48 => MessageDigest::sha384(),
            _ => MessageDigest::sha512(),
        }
    }

    /// The named curve an ECDSA algorithm requires.
    pub(crate) const fn curve(self) -> Option<Nid> {
        match self {
            Self::ES256 => Some(Nid::X9_62_PRIME256V1),
            Self::ES384 => Some(Nid::SECP384R1),
            Self::ES512 => Some(Nid::SECP521R1),
            _ => None,
        }
    }

    pub(crate) fn from_curve(nid: Nid) -> Option<Self> {
        match nid {
            Nid::X9_62_PRIME256V1 => Some(Self::ES256),
            Nid::SECP384R1 => Some(Self::ES384),
            Nid::SECP521R1 => Some(Self::ES512),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| AuthError::UnknownAlgorithm(s.to_string()))
    }
}
