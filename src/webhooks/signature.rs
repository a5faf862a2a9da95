//! Trello webhook signature verification using double-HMAC-SHA1.
//!
//! Trello signs each webhook delivery with HMAC-SHA1 over the raw request
//! body concatenated with the callback URL, keyed by the client secret, and
//! sends the base64 digest in the `X-Trello-Webhook` header.
//!
//! Verification re-hashes both sides once more with the same key and compares
//! the re-hashed values, so the comparison never operates on a raw signature
//! and a byte-wise mismatch position reveals nothing about the secret. The
//! final comparison operands are fixed-length HMAC outputs, not secrets, so
//! plain string equality is sufficient there.
//!
//! The construction (concatenation order, SHA-1, the double-hash step, base64
//! encoding) must match Trello's signer exactly.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Computes `base64(HMAC-SHA1(key=secret, message))`.
fn base64_digest(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Computes the signature Trello would send for a given body and callback
/// hostname: the base64 HMAC-SHA1 of `body || hostname` (no separator).
///
/// This is the signer side of the scheme, useful for testing.
pub fn compute_signature(body: &[u8], hostname: &str, secret: &[u8]) -> String {
    let mut content = Vec::with_capacity(body.len() + hostname.len());
    content.extend_from_slice(body);
    content.extend_from_slice(hostname.as_bytes());
    base64_digest(secret, &content)
}

/// Verifies an inbound delivery against the shared secret.
///
/// `signature_header` is the value of the `X-Trello-Webhook` header; callers
/// pass an empty string when the header is absent, which never matches a
/// valid signature. Never panics.
pub fn verify_signature(
    body: &[u8],
    hostname: &str,
    signature_header: &str,
    secret: &[u8],
) -> bool {
    let content_hash = compute_signature(body, hostname, secret);
    let expected = base64_digest(secret, content_hash.as_bytes());
    let received = base64_digest(secret, signature_header.as_bytes());
    expected == received
}
