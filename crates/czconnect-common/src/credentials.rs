//! Space credentials issued by the hub, and token expiry checks.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Utc;
use log::debug;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Seconds subtracted from a token's embedded expiry before it is treated
/// as already expired. Tokens this close to expiry could lapse while a
/// connection that presented them is still in flight.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 120;

/// Connection parameters for one space, as issued by the hub.
///
/// Cached by the agent and replaced wholesale on every successful fetch,
/// never partially updated, never persisted. The token is the raw
/// `Proxy-Authorization` value and stays redacted in `Debug` output.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceCredentials {
    /// Network address of the space proxy.
    pub host: String,
    /// Bearer value with embedded expiry metadata; sent verbatim.
    pub token: SecretString,
    /// PEM certificate to trust as the space proxy's CA.
    pub cert: String,
}

impl SpaceCredentials {
    /// Whether the embedded token expiry has passed or falls within the
    /// safety margin.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        is_token_expired(self.token.expose_secret())
    }
}

/// Extracts the embedded `exp` claim (Unix seconds) from a dot-delimited
/// token.
///
/// The second segment is base64-decoded (URL-safe alphabet first, standard
/// as a fallback) and parsed as JSON. Returns `None` when the token does
/// not carry a readable numeric expiry.
#[must_use]
pub fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD.decode(payload))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims.get("exp")?.as_i64()
}

/// Whether a token is expired, applying the safety margin.
///
/// A token without a readable expiry is treated as expired rather than an
/// error, so a malformed credential triggers a refetch instead of failing
/// the connection outright.
#[must_use]
pub fn is_token_expired(token: &str) -> bool {
    token_expiry(token).is_none_or(|exp| {
        let expired = exp - TOKEN_EXPIRY_MARGIN_SECS < Utc::now().timestamp();
        if expired {
            debug!("space token expired or within safety margin (exp={exp})");
        }
        expired
    })
}
