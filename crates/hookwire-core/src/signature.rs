//! HMAC-SHA256 signing and verification of webhook payloads.
//!
//! Signatures use the `sha256=<hex>` form carried in the
//! `X-Hub-Signature-256` header. Verification always runs over the exact
//! bytes that were transmitted and compares digests in constant time.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of every signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Length of a hex-encoded SHA-256 digest.
const HEX_DIGEST_LEN: usize = 64;

/// Signing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Secret is empty.
    #[error("secret is empty")]
    EmptySecret,
    /// Secret was rejected by the MAC.
    #[error("invalid secret key")]
    InvalidSecret,
}

/// Shared secret used to sign and verify deliveries.
///
/// Immutable once constructed. `Debug` output never includes the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Creates a secret from raw key material.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true when no key material is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(key: &str) -> Self {
        Self::new(key.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(key: String) -> Self {
        Self::new(key.into_bytes())
    }
}

/// Signs `payload` with `secret`, returning `sha256=<lowercase hex>`.
///
/// # Errors
///
/// Returns [`SignatureError::EmptySecret`] if the secret is empty.
///
/// # Example
///
/// ```
/// use hookwire_core::{sign, verify};
///
/// let signature = sign(b"mySecret", b"{}").unwrap();
/// assert!(signature.starts_with("sha256="));
/// assert!(verify(b"mySecret", b"{}", &signature));
/// ```
pub fn sign(secret: &[u8], payload: &[u8]) -> Result<String, SignatureError> {
    let mac = keyed_mac(secret, payload)?;
    Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes())))
}

/// Verifies `signature` against `payload` and `secret`.
///
/// Returns false for an empty secret, a missing `sha256=` prefix, a digest
/// that is not exactly 64 hex characters, or a digest mismatch. Never panics.
pub fn verify(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    if hex_digest.len() != HEX_DIGEST_LEN {
        return false;
    }

    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    match keyed_mac(secret, payload) {
        // verify_slice compares in constant time
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

fn keyed_mac(secret: &[u8], payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(payload);
    Ok(mac)
}
