//! Backoff state used by the shipper worker.

use std::time::Duration;

use crate::stats::grow;

use super::config::BackoffPolicy;

/// Sleep applied before the next connection attempt.
///
/// Grows by the policy multiplier on every failure and returns to the
/// initial value after a successful write.
#[derive(Debug)]
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.initial,
            policy,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn record_failure(&mut self) -> Duration {
        self.current = grow(self.current, self.policy.multiplier, self.policy.cap);
        self.current
    }

    pub fn record_success(&mut self) {
        self.current = self.policy.initial;
    }
}
