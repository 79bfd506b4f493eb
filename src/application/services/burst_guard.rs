//! Short-horizon flood detection, independent of per-identity limits.
//!
//! Two gauges run over the same process-wide state. The burst counter
//! watches a five-second bucket and trips a thirty-second cooldown that
//! denies everything. The requests-per-second gauge keeps a rolling list
//! of arrivals from the last second and denies with a fixed retry-after
//! when it overflows, without tripping the longer cooldown.

use crate::domain::clock::Clock;
use crate::domain::entities::BurstState;
use crate::error::{Denial, DenialReason};
use chrono::Duration;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BurstGuardSettings {
    /// Arrivals tolerated per burst window before the cooldown trips.
    pub burst_limit: u32,
    pub burst_window: Duration,
    /// Cooldown during which every call is denied.
    pub cooldown: Duration,
    /// Arrivals tolerated within any rolling second.
    pub rps_limit: usize,
    /// Retry-after for a requests-per-second denial.
    pub rps_retry_after: Duration,
}

impl Default for BurstGuardSettings {
    fn default() -> Self {
        Self {
            burst_limit: 30,
            burst_window: Duration::seconds(5),
            cooldown: Duration::seconds(30),
            rps_limit: 20,
            rps_retry_after: Duration::seconds(5),
        }
    }
}

pub struct BurstGuard {
    settings: BurstGuardSettings,
    clock: Arc<dyn Clock>,
    state: Mutex<BurstState>,
}

impl BurstGuard {
    pub fn new(settings: BurstGuardSettings, clock: Arc<dyn Clock>) -> Self {
        let state = Mutex::new(BurstState::new(clock.now()));
        Self {
            settings,
            clock,
            state,
        }
    }

    /// Records one arrival and checks both gauges.
    pub fn check(&self) -> Result<(), Denial> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if let Some(until) = state.cooldown_until.filter(|until| *until > now) {
            return Err(Denial::new(
                DenialReason::BurstDetected,
                "Burst cooldown active",
                until - now,
            ));
        }
        state.cooldown_until = None;

        if now - state.window_start > self.settings.burst_window {
            state.count = 0;
            state.window_start = now;
        }
        state.count += 1;
        if state.count > self.settings.burst_limit {
            state.cooldown_until = Some(now + self.settings.cooldown);
            return Err(Denial::new(
                DenialReason::BurstDetected,
                "Burst detected",
                self.settings.cooldown,
            ));
        }

        let cutoff = now - Duration::milliseconds(1000);
        while state.recent.front().is_some_and(|at| *at <= cutoff) {
            state.recent.pop_front();
        }
        state.recent.push_back(now);
        if state.recent.len() > self.settings.rps_limit {
            return Err(Denial::new(
                DenialReason::BurstDetected,
                "Requests per second ceiling exceeded",
                self.settings.rps_retry_after,
            ));
        }

        Ok(())
    }

    /// Whether the global cooldown is currently in force.
    pub fn cooldown_active(&self) -> bool {
        let now = self.clock.now();
        self.state
            .lock()
            .cooldown_until
            .is_some_and(|until| until > now)
    }

    /// Arrivals counted in the current burst window.
    pub fn window_count(&self) -> u32 {
        self.state.lock().count
    }
}
