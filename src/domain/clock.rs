//! Time source abstraction used by every windowed component.
//!
//! All time-dependent logic reads the current instant through [`Clock`]
//! instead of calling [`chrono::Utc::now`] directly. Production wiring uses
//! [`SystemClock`]; tests use [`ManualClock`] to cross window boundaries
//! deterministically without sleeping.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use parking_lot::Mutex;

/// A source of the current wall-clock instant.
///
/// Implementations must be cheap to call and safe to share across threads,
/// since every admission component holds an `Arc<dyn Clock>`.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time source backed by the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock whose instant only moves when [`ManualClock::advance`] is called.
///
/// Clones share the same underlying instant, so advancing one handle is
/// observed by every component holding a clone.
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a manual clock fixed at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut instant = self.instant.lock();
        *instant += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock()
    }
}
