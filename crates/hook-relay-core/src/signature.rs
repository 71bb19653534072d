//! Webhook signature computation and verification.
//!
//! The platform signs each delivery as the lowercase hex SHA-256 digest of
//! `secret || body`, where `body` is the compact JSON request body, and sends
//! it in the `X-HubSpot-Signature` header.
//!
//! Two signing inputs are supported:
//!
//! | Function | Signed bytes |
//! |----------|--------------|
//! | [`compute_signature_raw`] | the request body exactly as received |
//! | [`compute_signature`] | the canonical re-serialization of the parsed body |
//!
//! Canonical JSON uses `,` and `:` separators with no whitespace, keeps keys
//! in received order and escapes every character outside printable ASCII as
//! `\uXXXX`, which is the byte string the platform's own compact serializer
//! produces. [`SignatureVerifier::verify`] accepts a header matching either
//! digest; both require the shared secret.
//!
//! Comparison is exact (case-sensitive) and runs in constant time. Errors
//! never carry the expected digest.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Header carrying the platform's signature
pub const SIGNATURE_HEADER: &str = "X-HubSpot-Signature";

/// Errors produced while authenticating a delivery
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature header is missing")]
    MissingSignature,

    #[error("signature does not match")]
    Mismatch,

    #[error("payload could not be canonicalized: {0}")]
    Canonicalization(#[from] serde_json::Error),
}

impl SignatureError {
    /// Whether the failure means the caller is not authenticated
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::MissingSignature | Self::Mismatch)
    }
}

// ============================================================================
// Canonical JSON
// ============================================================================

/// Compact formatter that escapes everything outside printable ASCII
///
/// serde_json already escapes quotes, backslashes and control characters;
/// string fragments reaching this formatter only need non-ASCII and DEL
/// escaped as UTF-16 code units.
struct AsciiCompactFormatter;

impl serde_json::ser::Formatter for AsciiCompactFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            if start < index {
                writer.write_all(fragment[start..index].as_bytes())?;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize a payload to its canonical signing form
pub fn canonical_json(payload: &Value) -> Result<Vec<u8>, SignatureError> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiCompactFormatter);
    payload.serialize(&mut serializer)?;
    Ok(out)
}

// ============================================================================
// Digest Computation
// ============================================================================

/// Lowercase hex SHA-256 of `secret || bytes`
fn digest_hex(secret: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Signature over the canonical serialization of `payload`
pub fn compute_signature(secret: &str, payload: &Value) -> Result<String, SignatureError> {
    Ok(digest_hex(secret, &canonical_json(payload)?))
}

/// Signature over the request body exactly as received
pub fn compute_signature_raw(secret: &str, body: &[u8]) -> String {
    digest_hex(secret, body)
}

/// Exact comparison of a header-supplied token against a computed one
///
/// An absent header is a failure, never a pass.
pub fn verify_signature(header_token: Option<&str>, computed: &str) -> Result<(), SignatureError> {
    let header_token = header_token.ok_or(SignatureError::MissingSignature)?;

    if bool::from(header_token.as_bytes().ct_eq(computed.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Verifies deliveries against the configured shared secret
///
/// Built once at startup and shared across requests. The secret is wiped
/// from memory when the verifier is dropped and never appears in `Debug`
/// output.
pub struct SignatureVerifier {
    secret: Zeroizing<String>,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Expected token for a parsed payload (canonical form)
    pub fn compute(&self, payload: &Value) -> Result<String, SignatureError> {
        compute_signature(&self.secret, payload)
    }

    /// Expected token for raw body bytes
    pub fn compute_raw(&self, body: &[u8]) -> String {
        compute_signature_raw(&self.secret, body)
    }

    /// Authenticate a delivery
    ///
    /// Passes when `header_token` equals the digest of the raw body or the
    /// digest of the canonical re-serialization of `payload`.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::MissingSignature`] when no header was supplied
    /// - [`SignatureError::Mismatch`] when neither digest matches
    #[instrument(skip_all, fields(body_len = body.len(), has_signature = header_token.is_some()))]
    pub fn verify(
        &self,
        header_token: Option<&str>,
        body: &[u8],
        payload: &Value,
    ) -> Result<(), SignatureError> {
        let header_token = header_token.ok_or(SignatureError::MissingSignature)?;

        if verify_signature(Some(header_token), &self.compute_raw(body)).is_ok() {
            return Ok(());
        }

        let canonical = canonical_json(payload)?;
        if canonical.as_slice() == body {
            return Err(SignatureError::Mismatch);
        }

        verify_signature(Some(header_token), &digest_hex(&self.secret, &canonical))?;
        debug!("Signature matched canonical form; raw body differed in formatting");
        Ok(())
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
