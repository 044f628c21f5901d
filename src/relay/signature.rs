use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Lowercase hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign(body: &[u8], secret: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Check `provided` against the signature of the exact bytes received.
///
/// The comparison runs in constant time over the hex digests.
pub fn verify(body: &[u8], provided: Option<&str>, secret: &[u8]) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    let Some(expected) = sign(body, secret) else {
        return false;
    };
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
