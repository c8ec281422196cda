//! Client-side JWT inspection.
//!
//! The client never holds the signing secret, so it only reads the payload to
//! learn when the token expires. The server still verifies every request.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;
use time::OffsetDateTime;

/// Wall-clock unix seconds.
#[must_use]
pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Decode the payload segment of a JWT without verifying the signature.
#[must_use]
pub fn decode_payload(token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The `exp` claim as unix seconds, if present and numeric.
#[must_use]
pub fn expiry(token: &str) -> Option<i64> {
    decode_payload(token)?.get("exp")?.as_i64()
}

/// A token is expired when `exp < now`. Tokens that cannot be decoded or
/// carry no `exp` are treated as expired.
#[must_use]
pub fn is_expired(token: &str, now_unix: i64) -> bool {
    expiry(token).is_none_or(|exp| exp < now_unix)
}

/// Seconds left before expiry, or `None` if already expired or unreadable.
#[must_use]
pub fn remaining_secs(token: &str, now_unix: i64) -> Option<i64> {
    expiry(token).filter(|exp| *exp >= now_unix).map(|exp| exp - now_unix)
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
