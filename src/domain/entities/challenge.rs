//! Challenge token wire format.
//!
//! The solved challenge comes back as a `challenge_token` query parameter:
//! URL-safe base64 over a JSON payload. The `id`, `issued_at_ms`, and
//! `signature` fields are produced at issuance; `fingerprint` and
//! `solve_duration_ms` are filled in by the solving client and therefore
//! carry no integrity guarantee beyond plausibility checks.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Decoded `challenge_token` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeToken {
    /// Opaque challenge id generated at issuance.
    pub id: String,
    /// Issuance timestamp in unix milliseconds.
    pub issued_at_ms: i64,
    /// Client-collected environment fingerprint.
    pub fingerprint: String,
    /// Client-reported time spent solving, in milliseconds.
    pub solve_duration_ms: i64,
    /// Hex HMAC over `id` and `issued_at_ms`, minted server-side.
    pub signature: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenDecodeError {
    #[error("token is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("token payload is not valid JSON")]
    Json(#[from] serde_json::Error),
}

impl ChallengeToken {
    /// Decodes a raw query-parameter value.
    pub fn decode(raw: &str) -> Result<Self, TokenDecodeError> {
        let bytes = URL_SAFE_NO_PAD.decode(raw.as_bytes())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Encodes the token the way the challenge page does.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("token fields always serialize");
        URL_SAFE_NO_PAD.encode(json)
    }
}
