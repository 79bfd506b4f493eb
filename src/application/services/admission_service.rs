//! Admission pipeline composition.
//!
//! One service owns the decision for every inbound request: resolve the
//! caller identity, settle an attached challenge token, ingest suspicious
//! header signals, then consult the rate limiter, the reputation tracker,
//! and the burst guard in that order, short-circuiting on the first
//! refusal. Admitted calls claim a concurrent-connection slot that is
//! released when the returned permit drops.

use crate::application::services::burst_guard::BurstGuard;
use crate::application::services::challenge_service::ChallengeService;
use crate::application::services::connection_gauge::{ConnectionGauge, ConnectionPermit};
use crate::application::services::rate_limiter::RateLimiter;
use crate::application::services::reputation::ReputationTracker;
use crate::domain::identity::{UNKNOWN_IDENTITY, resolve_identity};
use crate::domain::signals;
use crate::error::{Denial, DenialReason};
use axum::http::{HeaderMap, Method};
use chrono::Duration;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AdmissionSettings {
    /// Concurrent forwarded calls allowed per identity.
    pub max_concurrent: usize,
    /// Reputation points deducted for a route-ceiling violation.
    pub route_violation_penalty: i32,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 15,
            route_violation_penalty: 3,
        }
    }
}

/// Decision for one request.
pub enum AdmissionOutcome {
    /// Forward the request; dropping the permit releases the slot.
    Forward(ConnectionPermit),
    /// Serve the interstitial challenge page instead of the response.
    Challenge,
    /// Refuse with a synthetic 429.
    Deny(Denial),
}

pub struct AdmissionService {
    settings: AdmissionSettings,
    rate_limiter: Arc<RateLimiter>,
    reputation: Arc<ReputationTracker>,
    burst: Arc<BurstGuard>,
    challenges: Arc<ChallengeService>,
    gauge: ConnectionGauge,
}

impl AdmissionService {
    pub fn new(
        settings: AdmissionSettings,
        rate_limiter: Arc<RateLimiter>,
        reputation: Arc<ReputationTracker>,
        burst: Arc<BurstGuard>,
        challenges: Arc<ChallengeService>,
    ) -> Self {
        let gauge = ConnectionGauge::new(settings.max_concurrent);
        Self {
            settings,
            rate_limiter,
            reputation,
            burst,
            challenges,
            gauge,
        }
    }

    /// Runs one request through the full pipeline.
    ///
    /// `challenge_token` is the raw `challenge_token` query value when the
    /// request carries one; a valid token clears the caller's reputation
    /// before the admission checks run.
    pub fn admit(
        &self,
        headers: &HeaderMap,
        path: &str,
        method: &Method,
        challenge_token: Option<&str>,
    ) -> AdmissionOutcome {
        let identity = resolve_identity(headers);
        if identity == UNKNOWN_IDENTITY {
            tracing::debug!(%method, path, "caller identity unresolved, sharing fallback bucket");
        }

        if let Some(raw) = challenge_token {
            match self.challenges.validate(raw) {
                Ok(()) => {
                    self.reputation.clear(&identity);
                    tracing::info!(%identity, "challenge passed, reputation cleared");
                }
                Err(denial) => return AdmissionOutcome::Deny(denial),
            }
        }

        // Header signals feed the score before it is consulted, so a
        // crossing caused by this request reports as SuspiciousHeaders
        // instead of being masked by the mirrored global block.
        let mut crossed_now = false;
        for signal in signals::inspect(headers) {
            let outcome = self.reputation.penalize(&identity, signal.penalty);
            tracing::debug!(
                %identity,
                signal = signal.description,
                score = outcome.score,
                "suspicious signal"
            );
            crossed_now |= outcome.crossed_threshold;
        }
        if crossed_now {
            let remaining = self
                .reputation
                .blocked_for(&identity)
                .unwrap_or_else(Duration::zero);
            return AdmissionOutcome::Deny(Denial::new(
                DenialReason::SuspiciousHeaders,
                "Suspicious request headers",
                remaining,
            ));
        }

        if let Err(denied) = self.rate_limiter.admit(&identity, path) {
            if let Some(class) = denied.route_violation {
                self.reputation
                    .penalize(&identity, self.settings.route_violation_penalty);
                tracing::warn!(%identity, route = class.label(), "route ceiling violated");
            }
            return AdmissionOutcome::Deny(denied.denial);
        }

        if let Some(remaining) = self.reputation.blocked_for(&identity) {
            return AdmissionOutcome::Deny(Denial::new(
                DenialReason::ReputationBlocked,
                "Reputation blocked",
                remaining,
            ));
        }
        if self.reputation.needs_challenge(&identity) {
            return AdmissionOutcome::Challenge;
        }

        if let Err(denial) = self.burst.check() {
            return AdmissionOutcome::Deny(denial);
        }

        match self.gauge.acquire(&identity) {
            Some(permit) => AdmissionOutcome::Forward(permit),
            None => AdmissionOutcome::Deny(Denial::new(
                DenialReason::RateLimitExceeded,
                "Too many concurrent requests",
                Duration::seconds(1),
            )),
        }
    }

    /// Total forwarded calls currently in flight.
    pub fn active_connections(&self) -> usize {
        self.gauge.active_total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::burst_guard::BurstGuardSettings;
    use crate::application::services::challenge_service::ChallengeSettings;
    use crate::application::services::rate_limiter::RateLimiterSettings;
    use crate::application::services::reputation::ReputationSettings;
    use crate::domain::clock::{Clock, ManualClock};
    use axum::http::HeaderValue;
    use chrono::{TimeZone, Utc};

    fn pipeline() -> (AdmissionService, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());

        let rate_limiter = Arc::new(RateLimiter::new(RateLimiterSettings::default(), shared.clone()));
        let reputation = Arc::new(ReputationTracker::new(
            ReputationSettings::default(),
            shared.clone(),
            rate_limiter.clone(),
        ));
        let burst = Arc::new(BurstGuard::new(BurstGuardSettings::default(), shared.clone()));
        let challenges = Arc::new(ChallengeService::new(
            "test-signing-secret".to_string(),
            ChallengeSettings::default(),
            shared,
        ));
        let service = AdmissionService::new(
            AdmissionSettings::default(),
            rate_limiter,
            reputation,
            burst,
            challenges,
        );
        (service, clock)
    }

    fn browser_headers(ip: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) Firefox/126.0"),
        );
        headers.insert("cf-connecting-ip", HeaderValue::from_str(ip).unwrap());
        headers
    }

    #[test]
    fn ordinary_request_is_forwarded_with_a_permit() {
        let (service, _) = pipeline();

        let outcome = service.admit(&browser_headers("1.2.3.4"), "/topics", &Method::GET, None);

        let AdmissionOutcome::Forward(permit) = outcome else {
            panic!("expected forward");
        };
        assert_eq!(service.active_connections(), 1);
        drop(permit);
        assert_eq!(service.active_connections(), 0);
    }

    #[test]
    fn suspicious_headers_crossing_reports_its_own_reason() {
        let (service, clock) = pipeline();
        let headers = HeaderMap::new();

        // Missing user agent costs 2 per request: the fifth crossing
        // request is denied as SuspiciousHeaders, not as a rate limit.
        let mut last = None;
        for _ in 0..5 {
            clock.advance(Duration::milliseconds(200));
            last = Some(service.admit(&headers, "/topics", &Method::GET, None));
        }

        let AdmissionOutcome::Deny(denial) = last.unwrap() else {
            panic!("expected denial");
        };
        assert_eq!(denial.reason, DenialReason::SuspiciousHeaders);
        assert!(denial.retry_after_secs > 0);
    }

    #[test]
    fn reputation_block_surfaces_through_the_rate_limiter() {
        let (service, clock) = pipeline();

        let headers = browser_headers("1.2.3.4");
        let outcome = service.admit(&headers, "/topics", &Method::GET, None);
        assert!(matches!(outcome, AdmissionOutcome::Forward(_)));

        // Crossing the threshold mirrors a block into the rate limiter's
        // global table, so the denial arrives from the first pipeline
        // stage rather than the reputation check.
        service.reputation.penalize("1.2.3.4", 12);
        clock.advance(Duration::milliseconds(200));
        let AdmissionOutcome::Deny(denial) =
            service.admit(&headers, "/topics", &Method::GET, None)
        else {
            panic!("expected denial");
        };
        assert_eq!(denial.reason, DenialReason::RateLimitExceeded);
        assert_eq!(denial.message, "Global rate limit active");
    }

    #[test]
    fn near_threshold_identity_is_challenged() {
        let (service, clock) = pipeline();
        let headers = browser_headers("1.2.3.4");

        service.reputation.penalize("1.2.3.4", 6);
        clock.advance(Duration::milliseconds(200));

        let outcome = service.admit(&headers, "/topics", &Method::GET, None);
        assert!(matches!(outcome, AdmissionOutcome::Challenge));
    }

    #[test]
    fn valid_challenge_token_clears_the_caller() {
        let (service, clock) = pipeline();
        let headers = browser_headers("1.2.3.4");

        service.reputation.penalize("1.2.3.4", 6);

        let issued = service.challenges.issue();
        clock.advance(Duration::seconds(1));
        let token = crate::domain::entities::ChallengeToken {
            id: issued.id.clone(),
            issued_at_ms: issued.issued_at_ms,
            fingerprint: "1920x1080x24|UTC|8|canvas".to_string(),
            solve_duration_ms: 800,
            signature: issued.signature,
        }
        .encode();

        let outcome = service.admit(&headers, "/topics", &Method::GET, Some(&token));
        assert!(matches!(outcome, AdmissionOutcome::Forward(_)));
        assert_eq!(service.reputation.score("1.2.3.4"), 0);

        // The next request is admitted without a challenge.
        clock.advance(Duration::milliseconds(200));
        let outcome = service.admit(&headers, "/topics", &Method::GET, None);
        assert!(matches!(outcome, AdmissionOutcome::Forward(_)));
    }

    #[test]
    fn invalid_challenge_token_denies_without_counting() {
        let (service, _) = pipeline();
        let headers = browser_headers("1.2.3.4");

        let AdmissionOutcome::Deny(denial) =
            service.admit(&headers, "/topics", &Method::GET, Some("garbage"))
        else {
            panic!("expected denial");
        };
        assert_eq!(denial.reason, DenialReason::ChallengeExpired);
    }

    #[test]
    fn route_violation_applies_a_reputation_penalty() {
        let (service, clock) = pipeline();
        let headers = browser_headers("1.2.3.4");

        for _ in 0..6 {
            clock.advance(Duration::milliseconds(200));
            let _ = service.admit(&headers, "/login", &Method::POST, None);
        }

        assert_eq!(service.reputation.score("1.2.3.4"), -3);
    }

    #[test]
    fn concurrency_ceiling_denies_when_saturated() {
        let (service, clock) = pipeline();
        let headers = browser_headers("1.2.3.4");

        let mut permits = Vec::new();
        for _ in 0..15 {
            clock.advance(Duration::milliseconds(200));
            match service.admit(&headers, "/topics", &Method::GET, None) {
                AdmissionOutcome::Forward(permit) => permits.push(permit),
                _ => panic!("expected forward"),
            }
        }

        clock.advance(Duration::milliseconds(200));
        let AdmissionOutcome::Deny(denial) =
            service.admit(&headers, "/topics", &Method::GET, None)
        else {
            panic!("expected denial");
        };
        assert_eq!(denial.message, "Too many concurrent requests");

        permits.clear();
        clock.advance(Duration::milliseconds(200));
        let outcome = service.admit(&headers, "/topics", &Method::GET, None);
        assert!(matches!(outcome, AdmissionOutcome::Forward(_)));
    }
}
