//! Proof-of-work challenge issuance and token validation.
//!
//! Issuance embeds a random challenge id, the issuance timestamp, and an
//! HMAC-SHA256 signature over both into the challenge page. The signature
//! is minted with a server-held secret, so a caller cannot fabricate a
//! fresh-looking token; the client-reported solve duration and fingerprint
//! remain plausibility checks only and raise cost for unsophisticated
//! automation rather than providing a hard guarantee.
//!
//! Validation is fail-closed: any parse, signature, freshness, or timing
//! failure denies the request.

use crate::domain::clock::Clock;
use crate::domain::entities::ChallengeToken;
use crate::error::{Denial, DenialReason};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Length of random bytes behind a challenge id.
const CHALLENGE_ID_BYTES: usize = 9;

#[derive(Debug, Clone)]
pub struct ChallengeSettings {
    /// Tokens older than this are rejected.
    pub max_age: Duration,
    /// Solve durations under this are treated as automated solving.
    pub min_solve_ms: i64,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            max_age: Duration::minutes(5),
            min_solve_ms: 500,
        }
    }
}

/// Material embedded into the challenge page at issuance.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub id: String,
    pub issued_at_ms: i64,
    pub signature: String,
}

pub struct ChallengeService {
    signing_secret: String,
    settings: ChallengeSettings,
    clock: Arc<dyn Clock>,
    /// Outstanding challenges by id; an entry is consumed by the first
    /// validation that reaches it.
    pending: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ChallengeService {
    pub fn new(signing_secret: String, settings: ChallengeSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            signing_secret,
            settings,
            clock,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Signs a challenge id and issuance timestamp.
    ///
    /// Returns a 64-character lowercase hex-encoded MAC.
    fn sign(&self, id: &str, issued_at_ms: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(issued_at_ms.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signature_matches(&self, token: &ChallengeToken) -> bool {
        let Ok(provided) = hex::decode(&token.signature) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(token.id.as_bytes());
        mac.update(b".");
        mac.update(token.issued_at_ms.to_string().as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    /// Generates a challenge and remembers it until solved or expired.
    pub fn issue(&self) -> IssuedChallenge {
        let id = generate_challenge_id();
        let now = self.clock.now();
        let issued_at_ms = now.timestamp_millis();

        self.pending.lock().insert(id.clone(), now);

        IssuedChallenge {
            signature: self.sign(&id, issued_at_ms),
            id,
            issued_at_ms,
        }
    }

    /// Validates a returned `challenge_token` value.
    ///
    /// Checks, in order: decoding, signature, freshness, single use,
    /// fingerprint presence, and solve duration. A token that reaches the
    /// single-use check is consumed even when a later check fails, so a
    /// too-fast solver burns its challenge and must request another.
    pub fn validate(&self, raw: &str) -> Result<(), Denial> {
        let expired = |message: &str| {
            Denial::new(
                DenialReason::ChallengeExpired,
                message.to_string(),
                Duration::zero(),
            )
        };

        let token =
            ChallengeToken::decode(raw).map_err(|_| expired("Malformed challenge token"))?;

        if !self.signature_matches(&token) {
            return Err(expired("Invalid challenge signature"));
        }

        let Some(issued_at) = DateTime::from_timestamp_millis(token.issued_at_ms) else {
            return Err(expired("Malformed challenge timestamp"));
        };
        let now = self.clock.now();
        if now - issued_at > self.settings.max_age {
            self.pending.lock().remove(&token.id);
            return Err(expired("Challenge expired"));
        }

        if self.pending.lock().remove(&token.id).is_none() {
            return Err(expired("Unknown or already used challenge"));
        }

        if token.fingerprint.trim().is_empty() {
            return Err(expired("Missing challenge fingerprint"));
        }

        if token.solve_duration_ms < self.settings.min_solve_ms {
            return Err(Denial::new(
                DenialReason::ChallengeTooFast,
                "Challenge solved too quickly",
                Duration::zero(),
            ));
        }

        Ok(())
    }

    /// Drops pending challenges older than the freshness window.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let max_age = self.settings.max_age;
        self.pending
            .lock()
            .retain(|_, issued_at| now - *issued_at <= max_age);
    }

    /// Number of outstanding challenges.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Random URL-safe challenge id.
fn generate_challenge_id() -> String {
    let mut buffer = [0u8; CHALLENGE_ID_BYTES];
    getrandom::fill(&mut buffer).expect("Failed to generate random bytes");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer)
}
