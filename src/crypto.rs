//! Hashing and message authentication helpers.
//!
//! - Session tokens are stored as SHA-256 hex digests, never in plaintext.
//! - Paystack signs webhook bodies with HMAC-SHA512 keyed by the secret key
//!   and sends the lowercase hex digest in `x-paystack-signature`.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result, msg};

type HmacSha512 = Hmac<Sha512>;

/// Hash a bearer secret (session token) for storage and lookup.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the lowercase hex HMAC-SHA512 of `payload`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a provided hex signature against the HMAC-SHA512 of `payload`.
///
/// Hex case is significant, matching the gateway's lowercase output.
pub fn verify_payload_signature(secret: &str, payload: &[u8], signature: &str) -> Result<bool> {
    let expected = sign_payload(secret, payload)?;
    let expected_bytes = expected.as_bytes();
    let provided_bytes = signature.trim().as_bytes();

    // Length is not secret: always 128 hex chars for SHA-512.
    if expected_bytes.len() != provided_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(provided_bytes).into())
}
