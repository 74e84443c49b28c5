//! Token claim sets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthError, Result};

/// Expiration time, seconds since the Unix epoch.
pub const EXPIRES_AT: &str = "exp";
/// Issued-at time, seconds since the Unix epoch.
pub const ISSUED_AT: &str = "iat";
/// Not-before time, seconds since the Unix epoch.
pub const NOT_BEFORE: &str = "nbf";
/// Unique token id.
pub const TOKEN_ID: &str = "jti";
/// Store code the request should switch to.
pub const STORE_CODE: &str = "store";

/// Claims set by the issuer that callers cannot override.
pub const RESERVED: [&str; 3] = [EXPIRES_AT, ISSUED_AT, TOKEN_ID];

/// A JSON object of claims, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// An empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Claims::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a claim, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Get a claim.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get a string claim.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Remove a claim.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Returns `true` if the claim is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the claims.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The `exp` claim.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.timestamp(EXPIRES_AT)
    }

    /// The `iat` claim.
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.timestamp(ISSUED_AT)
    }

    /// The `nbf` claim.
    #[must_use]
    pub fn not_before(&self) -> Option<i64> {
        self.timestamp(NOT_BEFORE)
    }

    /// The `jti` claim.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str(TOKEN_ID)
    }

    /// The store code claim.
    #[must_use]
    pub fn store_code(&self) -> Option<&str> {
        self.get_str(STORE_CODE).filter(|code| !code.is_empty())
    }

    /// Copy every claim from `other` except the reserved ones.
    ///
    /// Returns the names of the reserved claims that were dropped.
    pub fn merge_unreserved(&mut self, other: Self) -> Vec<String> {
        let mut dropped = Vec::new();
        for (name, value) in other.0 {
            if RESERVED.contains(&name.as_str()) {
                dropped.push(name);
            } else {
                self.0.insert(name, value);
            }
        }
        dropped
    }

    /// Check `exp` and `nbf` against `now` (seconds since the epoch).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Malformed`] if `exp` is missing or not a number,
    /// [`AuthError::TokenExpired`] once `now >= exp`, and
    /// [`AuthError::TokenNotYetValid`] while `now < nbf`.
    pub fn validate_times(&self, now: i64) -> Result<()> {
        if self.contains(EXPIRES_AT) && self.expires_at().is_none() {
            return Err(AuthError::Malformed("exp claim is not a number".to_string()));
        }
        let exp = self
            .expires_at()
            .ok_or_else(|| AuthError::Malformed("missing exp claim".to_string()))?;
        if now >= exp {
            return Err(AuthError::TokenExpired);
        }
        if self.contains(NOT_BEFORE) {
            let nbf = self
                .not_before()
                .ok_or_else(|| AuthError::Malformed("nbf claim is not a number".to_string()))?;
            if now < nbf {
                return Err(AuthError::TokenNotYetValid);
            }
        }
        Ok(())
    }

    /// Consume into the underlying JSON object.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    fn timestamp(&self, name: &str) -> Option<i64> {
        let value = self.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_claims_are_not_merged() {
        let mut claims = Claims::new().with(EXPIRES_AT, 100).with(ISSUED_AT, 50);
        let extra = Claims::new()
            .with(EXPIRES_AT, 999_999)
            .with(TOKEN_ID, "forged")
            .with("mascot", "gopher");

        let dropped = claims.merge_unreserved(extra);

        assert_eq!(dropped, vec![EXPIRES_AT.to_string(), TOKEN_ID.to_string()]);
        assert_eq!(claims.expires_at(), Some(100));
        assert_eq!(claims.id(), None);
        assert_eq!(claims.get_str("mascot"), Some("gopher"));
    }

    #[test]
    fn timestamps_accept_floats() {
        let claims: Claims = serde_json::from_value(json!({"exp": 1_700_000_000.5})).unwrap();
        assert_eq!(claims.expires_at(), Some(1_700_000_000));
    }

    #[test]
    fn time_validation() {
        let claims = Claims::new().with(EXPIRES_AT, 100);
        assert!(claims.validate_times(99).is_ok());
        assert!(matches!(
            claims.validate_times(100),
            Err(AuthError::TokenExpired)
        ));

        let claims = Claims::new().with(EXPIRES_AT, 100).with(NOT_BEFORE, 50);
        assert!(matches!(
            claims.validate_times(49),
            Err(AuthError::TokenNotYetValid)
        ));
        assert!(claims.validate_times(50).is_ok());
    }

    #[test]
    fn missing_or_bad_exp_is_malformed() {
        assert!(matches!(
            Claims::new().validate_times(0),
            Err(AuthError::Malformed(_))
        ));
        assert!(matches!(
            Claims::new().with(EXPIRES_AT, "soon").validate_times(0),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn empty_store_code_is_none() {
        assert_eq!(Claims::new().with(STORE_CODE, "").store_code(), None);
        assert_eq!(Claims::new().with(STORE_CODE, "de").store_code(), Some("de"));
    }

    #[test]
    fn from_iterator() {
        let claims: Claims = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims.get("b"), Some(&json!(2)));
    }
}
