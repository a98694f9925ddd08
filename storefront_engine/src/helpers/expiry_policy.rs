//! Clock and hold expiry policy.
//!
//! Liveness of a hold is a pure function of "now" and the time the hold was created. The [`Clock`] trait exists so that
//! tests can move time forward without sleeping.
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_HOLD_DURATION: Duration = Duration::minutes(30);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(RwLock::new(start)) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    hold_duration: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self { hold_duration: DEFAULT_HOLD_DURATION }
    }
}

impl ExpiryPolicy {
    pub fn new(hold_duration: Duration) -> Self {
        Self { hold_duration }
    }

    pub fn hold_duration(&self) -> Duration {
        self.hold_duration
    }

    /// The absolute time at which a hold created at `created_at` lapses.
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.hold_duration
    }

    /// A hold is live strictly before its expiry time. At `expires_at` exactly it is already stale.
    pub fn is_live(&self, now: DateTime<Utc>, created_at: DateTime<Utc>) -> bool {
        now < self.expires_at(created_at)
    }
}
