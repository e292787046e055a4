//! Reconnect gate for the stats stream transport.
//!
//! Unlike the shipper's backoff, this gate never sleeps: callers ask whether
//! a retry window is open and skip the connection attempt when it is not.

use std::time::{Duration, Instant};

/// Lowest retry interval, restored after any successful connect.
pub const DEFAULT_STATS_BACKOFF_FLOOR: Duration = Duration::from_millis(500);
/// Upper bound on the retry interval.
pub const DEFAULT_STATS_BACKOFF_CAP: Duration = Duration::from_secs(10);
/// Factor applied to the interval after each consecutive failure.
pub const DEFAULT_STATS_BACKOFF_GROWTH: f64 = 1.25;

#[derive(Clone, Debug, PartialEq)]
pub struct StatsBackoffPolicy {
    pub floor: Duration,
    pub cap: Duration,
    pub growth: f64,
}

impl Default for StatsBackoffPolicy {
    fn default() -> Self {
        Self {
            floor: DEFAULT_STATS_BACKOFF_FLOOR,
            cap: DEFAULT_STATS_BACKOFF_CAP,
            growth: DEFAULT_STATS_BACKOFF_GROWTH,
        }
    }
}

/// Multiply `current` by `factor`, saturating at `cap`.
///
/// Factors below 1.0 (and NaN) leave the interval unchanged; products that
/// overflow `Duration` saturate to `cap`.
pub(crate) fn grow(current: Duration, factor: f64, cap: Duration) -> Duration {
    let factor = factor.max(1.0);
    Duration::try_from_secs_f64(current.as_secs_f64() * factor).map_or(cap, |next| next.min(cap))
}

/// Interval and retry deadline after connection failures.
#[derive(Debug)]
pub struct ConnectBackoff {
    policy: StatsBackoffPolicy,
    interval: Duration,
    next_retry: Option<Instant>,
}

impl ConnectBackoff {
    pub fn new(policy: StatsBackoffPolicy) -> Self {
        Self {
            interval: policy.floor,
            next_retry: None,
            policy,
        }
    }

    /// True while `now` falls inside the current backoff window.
    pub fn is_waiting(&self, now: Instant) -> bool {
        self.next_retry.is_some_and(|deadline| now < deadline)
    }

    /// Grow the interval and open a new window starting at `now`.
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.interval = grow(self.interval, self.policy.growth, self.policy.cap);
        self.next_retry = now
            .checked_add(self.interval)
            .or_else(|| now.checked_add(self.policy.floor));
        self.interval
    }

    pub fn record_success(&mut self) {
        self.interval = self.policy.floor;
        self.next_retry = None;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_retry(&self) -> Option<Instant> {
        self.next_retry
    }
}
