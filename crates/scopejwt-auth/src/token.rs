//! Token representation and the compact JWS codec.
//!
//! A token on the wire is `base64url(header) "." base64url(claims) "."
//! base64url(signature)`, unpadded, as in RFC 7515/7519. The signature
//! covers the first two segments joined by the dot.

use std::time::Duration;

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::claims::Claims;
use crate::error::{AuthError, Result};
use crate::key::Key;
use crate::signing::SigningMethod;

/// The JOSE header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Declared signing algorithm. Kept as a string so unknown values decode.
    pub alg: String,
    /// Media type, `JWT` for tokens issued here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Key id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Header {
    /// A header for `alg` with `typ` set to `JWT`.
    #[must_use]
    pub fn new(alg: Algorithm) -> Self {
        Self {
            alg: alg.as_str().to_string(),
            typ: Some("JWT".to_string()),
            kid: None,
        }
    }
}

/// A signed bearer token.
///
/// Tokens from [`crate::Service::new_token`] and the parse operations are
/// marked valid. A token is never re-trusted without parsing again.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The JOSE header.
    pub header: Header,
    /// The claim set.
    pub claims: Claims,
    raw: String,
    valid: bool,
}

impl Token {
    pub(crate) fn verified(header: Header, claims: Claims, raw: String) -> Self {
        Self {
            header,
            claims,
            raw,
            valid: true,
        }
    }

    /// The compact serialization.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the token was issued or verified by a service.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// The store code claim, if present.
    #[must_use]
    pub fn store_code(&self) -> Option<&str> {
        self.claims.store_code()
    }

    /// The expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.expires_at()?, 0)
    }

    /// Time left until `exp`, or `None` if it has passed or is missing.
    #[must_use]
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.remaining_ttl_at(Utc::now())
    }

    pub(crate) fn remaining_ttl_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let left = self.expires_at()? - now;
        left.to_std().ok().filter(|d| !d.is_zero())
    }
}

/// A decoded but unverified token.
#[derive(Debug)]
pub struct Unverified<'a> {
    /// The decoded header.
    pub header: Header,
    /// The decoded claims.
    pub claims: Claims,
    /// `header.claims`, the bytes the signature covers.
    pub signing_input: &'a str,
    /// The decoded signature.
    pub signature: Vec<u8>,
}

impl Unverified<'_> {
    /// Turn into a [`Token`] that is not marked valid.
    #[must_use]
    pub fn into_token(self, raw: &str) -> Token {
        Token {
            header: self.header,
            claims: self.claims,
            raw: raw.to_string(),
            valid: false,
        }
    }
}

/// Sign a header and claim set into the compact serialization.
///
/// # Errors
///
/// Returns an error if serialization or signing fails.
pub fn encode(
    method: &dyn SigningMethod,
    key: &Key,
    header: &Header,
    claims: &Claims,
) -> Result<String> {
    let header = serde_json::to_vec(header).map_err(|e| AuthError::Malformed(e.to_string()))?;
    let claims = serde_json::to_vec(claims).map_err(|e| AuthError::Malformed(e.to_string()))?;

    let mut raw = BASE64_URL_SAFE_NO_PAD.encode(header);
    raw.push('.');
    raw.push_str(&BASE64_URL_SAFE_NO_PAD.encode(claims));

    let signature = method.sign(raw.as_bytes(), key)?;
    raw.push('.');
    raw.push_str(&BASE64_URL_SAFE_NO_PAD.encode(signature));
    Ok(raw)
}

/// Split and decode a token without checking its signature.
///
/// # Errors
///
/// Returns [`AuthError::Malformed`] for anything that is not three
/// base64url segments holding a JSON header and a JSON object.
pub fn decode_unverified(raw: &str) -> Result<Unverified<'_>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AuthError::Malformed("empty token".to_string()));
    }
    let (signing_input, signature) = raw
        .rsplit_once('.')
        .ok_or_else(|| AuthError::Malformed("token must have three segments".to_string()))?;
    let (header, claims) = signing_input
        .split_once('.')
        .filter(|(_, claims)| !claims.contains('.'))
        .ok_or_else(|| AuthError::Malformed("token must have three segments".to_string()))?;

    let header: Header = serde_json::from_slice(&segment(header, "header")?)
        .map_err(|e| AuthError::Malformed(format!("header: {e}")))?;
    let claims: Claims = serde_json::from_slice(&segment(claims, "claims")?)
        .map_err(|e| AuthError::Malformed(format!("claims: {e}")))?;
    let signature = segment(signature, "signature")?;

    Ok(Unverified {
        header,
        claims,
        signing_input,
        signature,
    })
}

fn segment(part: &str, name: &str) -> Result<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD
        .decode(part.trim_end_matches('='))
        .map_err(|e| AuthError::Malformed(format!("{name} is not base64url: {e}")))
}
