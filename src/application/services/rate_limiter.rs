//! Fixed-window rate limiting keyed by identity and route class.
//!
//! Two tables are kept: one global entry per identity and one entry per
//! (identity, route class). The global ceiling is checked first and
//! short-circuits the route check, so a globally blocked caller never
//! touches route counters.
//!
//! Windows are fixed buckets, not token buckets: a burst straddling a
//! window boundary can pass twice the nominal rate. That approximation is
//! intentional and documented by
//! `admits_double_ceiling_across_window_boundary` below.

use crate::domain::clock::Clock;
use crate::domain::entities::{RateLimitEntry, RouteClass};
use crate::error::{Denial, DenialReason};
use chrono::Duration;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Ceilings and windows for every tier.
#[derive(Debug, Clone)]
pub struct RateLimiterSettings {
    /// Requests per window allowed per identity across all routes.
    pub global_limit: u32,
    /// Counting window for every tier except registration.
    pub window: Duration,
    /// Block installed when a ceiling is exceeded.
    pub block_duration: Duration,
    pub api_limit: u32,
    pub login_limit: u32,
    pub register_limit: u32,
    /// Registration uses a one-hour bucket.
    pub register_window: Duration,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        Self {
            global_limit: 120,
            window: Duration::seconds(60),
            block_duration: Duration::minutes(15),
            api_limit: 60,
            login_limit: 5,
            register_limit: 3,
            register_window: Duration::hours(1),
        }
    }
}

impl RateLimiterSettings {
    /// Ceiling and window for a route class; `None` means only the
    /// global ceiling applies.
    fn route_ceiling(&self, class: RouteClass) -> Option<(u32, Duration)> {
        match class {
            RouteClass::Generic => None,
            RouteClass::Api => Some((self.api_limit, self.window)),
            RouteClass::Login => Some((self.login_limit, self.window)),
            RouteClass::Register => Some((self.register_limit, self.register_window)),
        }
    }
}

/// A refused rate-limit check.
#[derive(Debug)]
pub struct RateLimitDenial {
    pub denial: Denial,
    /// Set when a route-class ceiling was freshly exceeded, so the caller
    /// can apply a reputation penalty.
    pub route_violation: Option<RouteClass>,
}

pub struct RateLimiter {
    settings: RateLimiterSettings,
    clock: Arc<dyn Clock>,
    global: Mutex<HashMap<String, RateLimitEntry>>,
    per_route: Mutex<HashMap<(String, RouteClass), RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(settings: RateLimiterSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            global: Mutex::new(HashMap::new()),
            per_route: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request for `identity` against `path` and admits or
    /// denies it.
    ///
    /// Decisions for a single identity are applied in arrival order: the
    /// counter increment and the ceiling check happen under one lock.
    pub fn admit(&self, identity: &str, path: &str) -> Result<(), RateLimitDenial> {
        let now = self.clock.now();

        {
            let mut global = self.global.lock();
            let entry = global
                .entry(identity.to_string())
                .or_insert_with(|| RateLimitEntry::new(now));

            if let Some(remaining) = entry.active_block(now) {
                return Err(RateLimitDenial {
                    denial: Denial::new(
                        DenialReason::RateLimitExceeded,
                        "Global rate limit active",
                        remaining,
                    ),
                    route_violation: None,
                });
            }

            entry.refresh(now, self.settings.window);
            entry.count += 1;
            if entry.count > self.settings.global_limit {
                entry.block(now, self.settings.block_duration);
                return Err(RateLimitDenial {
                    denial: Denial::new(
                        DenialReason::RateLimitExceeded,
                        "Rate limit exceeded",
                        self.settings.block_duration,
                    ),
                    route_violation: None,
                });
            }
        }

        let class = RouteClass::classify(path);
        let Some((ceiling, window)) = self.settings.route_ceiling(class) else {
            return Ok(());
        };

        let mut per_route = self.per_route.lock();
        let entry = per_route
            .entry((identity.to_string(), class))
            .or_insert_with(|| RateLimitEntry::new(now));

        if let Some(remaining) = entry.active_block(now) {
            return Err(RateLimitDenial {
                denial: Denial::new(
                    DenialReason::RateLimitExceeded,
                    format!("Rate limit exceeded for {}", class.label()),
                    remaining,
                ),
                route_violation: None,
            });
        }

        entry.refresh(now, window);
        entry.count += 1;
        if entry.count > ceiling {
            entry.block(now, self.settings.block_duration);
            return Err(RateLimitDenial {
                denial: Denial::new(
                    DenialReason::RateLimitExceeded,
                    format!("Rate limit exceeded for {}", class.label()),
                    self.settings.block_duration,
                ),
                route_violation: Some(class),
            });
        }

        Ok(())
    }

    /// Installs a time-boxed block on the identity's global entry.
    ///
    /// Called by the reputation tracker when a score crosses its
    /// threshold, so reputation blocks and rate-limit blocks are enforced
    /// through the same table.
    pub fn impose_block(&self, identity: &str, duration: Duration) {
        let now = self.clock.now();
        let mut global = self.global.lock();
        global
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitEntry::new(now))
            .block(now, duration);
    }

    /// Evicts entries with no live window or block. Returns the number of
    /// evicted entries.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;

        {
            let mut global = self.global.lock();
            let before = global.len();
            global.retain(|_, entry| !entry.is_stale(now, self.settings.window));
            evicted += before - global.len();
        }

        let mut per_route = self.per_route.lock();
        let before = per_route.len();
        per_route.retain(|(_, class), entry| {
            let window = match class {
                RouteClass::Register => self.settings.register_window,
                _ => self.settings.window,
            };
            !entry.is_stale(now, window)
        });
        evicted += before - per_route.len();

        evicted
    }

    /// Number of identities with a live global entry.
    pub fn tracked_identities(&self) -> usize {
        self.global.lock().len()
    }

    /// Number of identities currently under an active global block.
    pub fn active_blocks(&self) -> usize {
        let now = self.clock.now();
        self.global
            .lock()
            .values()
            .filter(|entry| entry.active_block(now).is_some())
            .count()
    }
}
