//! Suspicious-request signals that feed reputation penalties.
//!
//! Inspection is purely syntactic: it flags header shapes that legitimate
//! browsers do not produce. Each signal carries a penalty weight applied
//! to the caller's reputation score by the admission pipeline.

use axum::http::{HeaderMap, header};
use regex::Regex;
use std::sync::LazyLock;

static AUTOMATION_UA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(curl|wget|python-requests|go-http-client|scrapy|headless|phantomjs)\b")
        .expect("automation pattern is valid")
});

/// Shortest user agent a real browser plausibly sends.
const MIN_PLAUSIBLE_UA_LEN: usize = 10;

/// One flagged anomaly in the request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspiciousSignal {
    pub description: &'static str,
    /// Reputation points deducted for this signal.
    pub penalty: i32,
}

/// Inspects request headers and returns every signal they trip.
///
/// An empty result means the headers look ordinary; it is not a
/// guarantee of anything beyond that.
pub fn inspect(headers: &HeaderMap) -> Vec<SuspiciousSignal> {
    let mut signals = Vec::new();

    match headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        None => signals.push(SuspiciousSignal {
            description: "missing user agent",
            penalty: 2,
        }),
        Some(ua) if AUTOMATION_UA.is_match(ua) => signals.push(SuspiciousSignal {
            description: "automation user agent",
            penalty: 2,
        }),
        Some(ua) if ua.len() < MIN_PLAUSIBLE_UA_LEN => signals.push(SuspiciousSignal {
            description: "implausibly short user agent",
            penalty: 1,
        }),
        Some(_) => {}
    }

    if let Some(raw) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
        && raw
            .split(',')
            .any(|entry| entry.trim().parse::<std::net::IpAddr>().is_err())
    {
        signals.push(SuspiciousSignal {
            description: "malformed forwarded-for entry",
            penalty: 1,
        });
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_user_agent(ua: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(ua).unwrap());
        headers
    }

    #[test]
    fn browser_user_agent_is_clean() {
        let headers = with_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0",
        );

        assert!(inspect(&headers).is_empty());
    }

    #[test]
    fn missing_user_agent_is_penalized() {
        let signals = inspect(&HeaderMap::new());

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].description, "missing user agent");
        assert_eq!(signals[0].penalty, 2);
    }

    #[test]
    fn automation_user_agent_is_penalized() {
        let signals = inspect(&with_user_agent("curl/8.5.0"));

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].description, "automation user agent");
    }

    #[test]
    fn short_user_agent_is_penalized() {
        let signals = inspect(&with_user_agent("Mozilla"));

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].description, "implausibly short user agent");
        assert_eq!(signals[0].penalty, 1);
    }

    #[test]
    fn malformed_forwarded_for_is_penalized() {
        let mut headers = with_user_agent("Mozilla/5.0 (Macintosh) Safari/605.1.15");
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("8.8.8.8, <script>"),
        );

        let signals = inspect(&headers);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].description, "malformed forwarded-for entry");
    }

    #[test]
    fn signals_accumulate() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));

        let signals = inspect(&headers);

        assert_eq!(signals.len(), 2);
        let total: i32 = signals.iter().map(|s| s.penalty).sum();
        assert_eq!(total, 3);
    }
}
