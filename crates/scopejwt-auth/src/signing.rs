//! Signing methods.
//!
//! A [`SigningMethod`] signs and verifies the JWS signing input for one
//! [`Algorithm`]. HMAC, RSA (PKCS#1 v1.5) and ECDSA are backed by
//! `openssl`. [`HmacFast`] binds its secret once at construction so the
//! secret length is validated once instead of on every call.

use std::fmt;
use std::sync::Arc;

use openssl::bn::BigNum;
use openssl::ec::EcKeyRef;
use openssl::ecdsa::EcdsaSig;
use openssl::hash::{hash, MessageDigest};
use openssl::memcmp;
use openssl::pkey::{HasParams, HasPublic, PKey, PKeyRef, Private};
use openssl::sign::{Signer, Verifier};

use crate::algorithm::{Algorithm, KeyFamily};
use crate::error::{AuthError, Result};
use crate::key::Key;

/// Signs and verifies JWS signing input for one algorithm.
pub trait SigningMethod: Send + Sync + fmt::Debug {
    /// The algorithm written to the `alg` header.
    fn alg(&self) -> Algorithm;

    /// Sign `input` with `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not fit the algorithm or signing fails.
    fn sign(&self, input: &[u8], key: &Key) -> Result<Vec<u8>>;

    /// Verify `signature` over `input` with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSignature`] if the signature does not match.
    fn verify(&self, input: &[u8], signature: &[u8], key: &Key) -> Result<()>;

    /// Returns `true` when the method carries its own copy of the key.
    ///
    /// Such methods must be rebuilt when the scope's key changes.
    fn binds_key(&self) -> bool {
        false
    }
}

/// Resolve an algorithm name to a signing method.
///
/// # Errors
///
/// Returns [`AuthError::UnknownAlgorithm`] for names outside the supported set.
pub fn signing_method(name: &str) -> Result<Arc<dyn SigningMethod>> {
    Ok(for_algorithm(name.parse()?))
}

/// The signing method for an algorithm.
#[must_use]
pub fn for_algorithm(alg: Algorithm) -> Arc<dyn SigningMethod> {
    match alg.family() {
        KeyFamily::Hmac => Arc::new(Hmac { alg }),
        KeyFamily::Rsa => Arc::new(RsaPkcs1 { alg }),
        KeyFamily::Ecdsa => Arc::new(Ecdsa { alg }),
    }
}

/// The signing method a key uses when none is configured.
///
/// HMAC keys get an [`HmacFast`] bound to the key.
///
/// # Errors
///
/// Returns an error for empty or faulted keys, or HMAC secrets that are too short.
pub fn default_for_key(key: &Key) -> Result<Arc<dyn SigningMethod>> {
    if let Some(err) = key.error() {
        return Err(err.clone());
    }
    let alg = key.default_algorithm().ok_or(AuthError::EmptyKey)?;
    match alg.family() {
        KeyFamily::Hmac => Ok(Arc::new(HmacFast::new(alg, key)?)),
        _ => Ok(for_algorithm(alg)),
    }
}

/// HMAC signing that validates the secret on every call.
#[derive(Debug, Clone, Copy)]
pub struct Hmac {
    alg: Algorithm,
}

impl Hmac {
    /// Create an HMAC method for `alg`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyMismatch`] when `alg` is not an HMAC algorithm.
    pub fn new(alg: Algorithm) -> Result<Self> {
        if alg.family() == KeyFamily::Hmac {
            Ok(Self { alg })
        } else {
            Err(AuthError::KeyMismatch(alg))
        }
    }
}

impl SigningMethod for Hmac {
    fn alg(&self) -> Algorithm {
        self.alg
    }

    fn sign(&self, input: &[u8], key: &Key) -> Result<Vec<u8>> {
        let pkey = hmac_pkey(self.alg, key.hmac_secret()?)?;
        hmac_sign(self.alg, &pkey, input)
    }

    fn verify(&self, input: &[u8], signature: &[u8], key: &Key) -> Result<()> {
        let pkey = hmac_pkey(self.alg, key.hmac_secret()?)?;
        hmac_verify(self.alg, &pkey, input, signature)
    }
}

/// HMAC signing with a secret validated and cached at construction.
///
/// The `key` passed to `sign`/`verify` is ignored.
pub struct HmacFast {
    alg: Algorithm,
    pkey: PKey<Private>,
}

impl HmacFast {
    /// Bind an HMAC algorithm to a secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyTooShort`] if the secret is shorter than the digest,
    /// or the key's own error if it is faulted or not an HMAC secret.
    pub fn new(alg: Algorithm, key: &Key) -> Result<Self> {
        Hmac::new(alg)?;
        let pkey = hmac_pkey(alg, key.hmac_secret()?)?;
        Ok(Self { alg, pkey })
    }
}

impl fmt::Debug for HmacFast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacFast").field("alg", &self.alg).finish()
    }
}

impl SigningMethod for HmacFast {
    fn alg(&self) -> Algorithm {
        self.alg
    }

    fn sign(&self, input: &[u8], _key: &Key) -> Result<Vec<u8>> {
        hmac_sign(self.alg, &self.pkey, input)
    }

    fn verify(&self, input: &[u8], signature: &[u8], _key: &Key) -> Result<()> {
        hmac_verify(self.alg, &self.pkey, input, signature)
    }

    fn binds_key(&self) -> bool {
        true
    }
}

/// RSASSA-PKCS1-v1_5 signing.
#[derive(Debug, Clone, Copy)]
pub struct RsaPkcs1 {
    alg: Algorithm,
}

impl SigningMethod for RsaPkcs1 {
    fn alg(&self) -> Algorithm {
        self.alg
    }

    fn sign(&self, input: &[u8], key: &Key) -> Result<Vec<u8>> {
        let private = key.private_key(self.alg)?;
        let mut signer = Signer::new(self.alg.digest(), private).map_err(crypto)?;
        signer.update(input).map_err(crypto)?;
        signer.sign_to_vec().map_err(crypto)
    }

    fn verify(&self, input: &[u8], signature: &[u8], key: &Key) -> Result<()> {
        let public = key.public_key(self.alg)?;
        verify_with_digest(public, self.alg.digest(), input, signature)
    }
}

/// ECDSA signing with fixed-width `r || s` signatures.
#[derive(Debug, Clone, Copy)]
pub struct Ecdsa {
    alg: Algorithm,
}

impl SigningMethod for Ecdsa {
    fn alg(&self) -> Algorithm {
        self.alg
    }

    fn sign(&self, input: &[u8], key: &Key) -> Result<Vec<u8>> {
        let ec = key.private_key(self.alg)?.ec_key().map_err(crypto)?;
        let digest = hash(self.alg.digest(), input).map_err(crypto)?;
        let sig = EcdsaSig::sign(&digest, &ec).map_err(crypto)?;
        let width = i32::try_from(scalar_len(&ec)).map_err(|e| AuthError::Crypto(e.to_string()))?;
        let mut signature = sig.r().to_vec_padded(width).map_err(crypto)?;
        signature.extend(sig.s().to_vec_padded(width).map_err(crypto)?);
        Ok(signature)
    }

    fn verify(&self, input: &[u8], signature: &[u8], key: &Key) -> Result<()> {
        let ec = key.public_key(self.alg)?.ec_key().map_err(crypto)?;
        let width = scalar_len(&ec);
        if signature.len() != width * 2 {
            return Err(AuthError::InvalidSignature);
        }
        let r = BigNum::from_slice(&signature[..width]).map_err(|_| AuthError::InvalidSignature)?;
        let s = BigNum::from_slice(&signature[width..]).map_err(|_| AuthError::InvalidSignature)?;
        let sig =
            EcdsaSig::from_private_components(r, s).map_err(|_| AuthError::InvalidSignature)?;
        let digest = hash(self.alg.digest(), input).map_err(crypto)?;
        match sig.verify(&digest, &ec) {
            Ok(true) => Ok(()),
            _ => Err(AuthError::InvalidSignature),
        }
    }
}

fn crypto(err: openssl::error::ErrorStack) -> AuthError {
    AuthError::Crypto(err.to_string())
}

fn scalar_len<T: HasParams>(ec: &EcKeyRef<T>) -> usize {
    ec.group().order_bits().div_ceil(8) as usize
}

fn hmac_pkey(alg: Algorithm, secret: &[u8]) -> Result<PKey<Private>> {
    let min = alg.digest_len();
    if secret.len() < min {
        return Err(AuthError::KeyTooShort {
            alg,
            min,
            got: secret.len(),
        });
    }
    PKey::hmac(secret).map_err(crypto)
}

fn hmac_sign(alg: Algorithm, pkey: &PKey<Private>, input: &[u8]) -> Result<Vec<u8>> {
    let mut signer = Signer::new(alg.digest(), pkey).map_err(crypto)?;
    signer.update(input).map_err(crypto)?;
    signer.sign_to_vec().map_err(crypto)
}

fn hmac_verify(alg: Algorithm, pkey: &PKey<Private>, input: &[u8], signature: &[u8]) -> Result<()> {
    let expected = hmac_sign(alg, pkey, input)?;
    if expected.len() == signature.len() && memcmp::eq(&expected, signature) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}

fn verify_with_digest<T>(
    key: &PKeyRef<T>,
    digest: MessageDigest,
    input: &[u8],
    signature: &[u8],
) -> Result<()>
where
    T: HasPublic,
{
    let mut verifier = Verifier::new(digest, key).map_err(crypto)?;
    verifier.update(input).map_err(crypto)?;
    match verifier.verify(signature) {
        Ok(true) => Ok(()),
        _ => Err(AuthError::InvalidSignature),
    }
}
