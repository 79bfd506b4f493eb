//! Rate-limit bookkeeping types.

use chrono::{DateTime, Duration, Utc};

/// Coarse category a request path is bucketed into for tiered ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Generic,
    Api,
    Login,
    Register,
}

impl RouteClass {
    /// Classifies a path by substring match.
    ///
    /// Login and registration endpoints get the strictest tiers because
    /// they are the usual brute-force targets; anything else under
    /// `/api/` shares the API tier; the rest is generic.
    pub fn classify(path: &str) -> Self {
        if path.contains("/api/") {
            RouteClass::Api
        } else if path.contains("/login") || path.contains("/signin") {
            RouteClass::Login
        } else if path.contains("/register") || path.contains("/signup") {
            RouteClass::Register
        } else {
            RouteClass::Generic
        }
    }

    /// Canonical label used in denial messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            RouteClass::Generic => "generic",
            RouteClass::Api => "/api",
            RouteClass::Login => "/login",
            RouteClass::Register => "/register",
        }
    }
}

/// One identity's counter within the current fixed window.
///
/// Invariants:
/// - `count` is meaningful only for the window starting at `window_start`
/// - `blocked` implies `block_expires_at` is set; once it passes, the
///   whole entry resets on the next touch
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub blocked: bool,
    pub block_expires_at: Option<DateTime<Utc>>,
}

impl RateLimitEntry {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
            blocked: false,
            block_expires_at: None,
        }
    }

    /// Remaining block time, if a block is currently active.
    pub fn active_block(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.blocked {
            return None;
        }
        match self.block_expires_at {
            Some(expires) if expires > now => Some(expires - now),
            _ => None,
        }
    }

    /// Clears an expired block and rolls the counting window forward.
    ///
    /// Call before incrementing; an entry with an active block must be
    /// rejected by the caller instead.
    pub fn refresh(&mut self, now: DateTime<Utc>, window: Duration) {
        if self.blocked && self.active_block(now).is_none() {
            self.blocked = false;
            self.block_expires_at = None;
            self.count = 0;
            self.window_start = now;
        }
        if now - self.window_start > window {
            self.count = 0;
            self.window_start = now;
        }
    }

    /// Installs a time-boxed block.
    pub fn block(&mut self, now: DateTime<Utc>, duration: Duration) {
        self.blocked = true;
        self.block_expires_at = Some(now + duration);
    }

    /// Whether the entry holds no live state and can be evicted.
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.active_block(now).is_none() && now - self.window_start > window
    }
}
