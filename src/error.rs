//! Denial taxonomy and its HTTP mapping.
//!
//! Denials are values, not exceptions: every refusing path in the
//! admission pipeline produces a [`Denial`] so the middleware can
//! synthesize a 429 without error-handling special cases. Callers always
//! receive a `Retry-After` signal so they can back off correctly.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Duration;
use serde::Serialize;

/// Why a request was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("burst detected")]
    BurstDetected,
    #[error("reputation blocked")]
    ReputationBlocked,
    #[error("suspicious headers")]
    SuspiciousHeaders,
    #[error("challenge expired")]
    ChallengeExpired,
    #[error("challenge solved too fast")]
    ChallengeTooFast,
}

impl DenialReason {
    /// Coarse label used for the `error` field of the 429 body.
    pub fn error_label(self) -> &'static str {
        match self {
            DenialReason::RateLimitExceeded | DenialReason::ReputationBlocked => {
                "Rate limit exceeded"
            }
            DenialReason::BurstDetected
            | DenialReason::SuspiciousHeaders
            | DenialReason::ChallengeExpired
            | DenialReason::ChallengeTooFast => "Too many requests",
        }
    }

    /// Stable snake_case name for metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::RateLimitExceeded => "rate_limit_exceeded",
            DenialReason::BurstDetected => "burst_detected",
            DenialReason::ReputationBlocked => "reputation_blocked",
            DenialReason::SuspiciousHeaders => "suspicious_headers",
            DenialReason::ChallengeExpired => "challenge_expired",
            DenialReason::ChallengeTooFast => "challenge_too_fast",
        }
    }
}

/// A structured refusal returned by the admission pipeline.
#[derive(Debug, Clone)]
pub struct Denial {
    pub reason: DenialReason,
    pub message: String,
    pub retry_after_secs: u64,
}

impl Denial {
    /// Builds a denial; negative durations clamp to zero.
    pub fn new(reason: DenialReason, message: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            reason,
            message: message.into(),
            retry_after_secs: retry_after.num_seconds().max(0) as u64,
        }
    }
}

#[derive(Serialize)]
struct DenialBody {
    error: &'static str,
    message: String,
    retry_after: u64,
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let body = DenialBody {
            error: self.reason.error_label(),
            message: self.message,
            retry_after: self.retry_after_secs,
        };

        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, self.retry_after_secs.to_string())],
            Json(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_reasons_share_the_rate_limit_label() {
        assert_eq!(
            DenialReason::RateLimitExceeded.error_label(),
            "Rate limit exceeded"
        );
        assert_eq!(
            DenialReason::ReputationBlocked.error_label(),
            "Rate limit exceeded"
        );
        assert_eq!(DenialReason::BurstDetected.error_label(), "Too many requests");
        assert_eq!(
            DenialReason::ChallengeTooFast.error_label(),
            "Too many requests"
        );
    }

    #[test]
    fn negative_retry_after_clamps_to_zero() {
        let denial = Denial::new(
            DenialReason::ChallengeExpired,
            "Challenge expired",
            Duration::seconds(-3),
        );

        assert_eq!(denial.retry_after_secs, 0);
    }

    #[test]
    fn denial_response_is_429_with_retry_after_header() {
        let denial = Denial::new(
            DenialReason::RateLimitExceeded,
            "Rate limit exceeded for /login",
            Duration::seconds(900),
        );

        let response = denial.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "900"
        );
    }
}
