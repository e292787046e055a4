//! High level stats API layered over [`StatsConnection`].

use std::time::Instant;

use log::warn;

use crate::config::TelemetryConfig;

use super::{
    connection::StatsConnection,
    protocol::{format_counter, format_gauge, format_set, format_timing, is_valid_key},
};

/// Emits counters, timings, gauges, and sets through one shared connection.
///
/// Construct one client at service start and pass it by reference to every
/// call site. Every method returns `true` only when the line was written to
/// the socket.
#[derive(Debug)]
pub struct StatsClient {
    connection: StatsConnection,
}

impl StatsClient {
    pub fn new(connection: StatsConnection) -> Self {
        Self { connection }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(StatsConnection::from_config(config))
    }

    pub fn connection(&self) -> &StatsConnection {
        &self.connection
    }

    /// Send a pre-formatted line.
    pub fn send(&self, line: &str) -> bool {
        self.connection.send(line)
    }

    fn emit(&self, key: &str, line: impl FnOnce() -> String) -> bool {
        if !is_valid_key(key) {
            warn!("stats: refusing to emit invalid key {key:?}");
            return false;
        }
        self.connection.send(&line())
    }

    pub fn count(&self, key: &str, count: i64) -> bool {
        self.count_sampled(key, count, 1.0)
    }

    /// Emit a counter tagged with the rate at which the caller samples it.
    pub fn count_sampled(&self, key: &str, count: i64, sample: f64) -> bool {
        self.emit(key, || format_counter(key, count, sample))
    }

    pub fn timing(&self, key: &str, millis: f64) -> bool {
        self.emit(key, || format_timing(key, millis))
    }

    pub fn gauge(&self, key: &str, value: f64) -> bool {
        self.emit(key, || format_gauge(key, value))
    }

    pub fn unique_set(&self, key: &str, member: impl std::fmt::Display) -> bool {
        self.emit(key, || format_set(key, member))
    }

    /// Start a scoped timer that emits `key` when dropped.
    pub fn timer(&self, key: impl Into<String>) -> Timer<'_> {
        Timer {
            client: self,
            key: key.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Run `op`, emitting `<name>.calls` before it and `<name>.duration`
    /// after it. Failures additionally emit `<name>.exceptions` and are
    /// returned unchanged.
    pub fn wrap<T, E>(&self, name: &str, op: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.count(&format!("{name}.calls"), 1);
        let failure = FailureGuard::arm(self, format!("{name}.exceptions"));
        let _timer = self.timer(format!("{name}.duration"));
        let result = op();
        if result.is_ok() {
            failure.disarm();
        }
        result
    }

    /// Run `op`, emitting `<name>.response_time` on success or
    /// `<name>.exceptions` on failure.
    pub fn time_call<T, E>(&self, name: &str, op: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let failure = FailureGuard::arm(self, format!("{name}.exceptions"));
        let start = Instant::now();
        let result = op();
        if result.is_ok() {
            failure.disarm();
            self.timing(&format!("{name}.response_time"), elapsed_ms(start));
        }
        result
    }

    /// Run `op` with full lifecycle counters: `started`, then either
    /// `successes` plus `duration`, or `exceptions`. `prefix` is joined to
    /// `name` with a dot.
    pub fn instrument<T, E>(
        &self,
        name: &str,
        prefix: Option<&str>,
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_owned(),
        };
        self.count(&format!("{name}.started"), 1);
        let failure = FailureGuard::arm(self, format!("{name}.exceptions"));
        let start = Instant::now();
        let result = op();
        if result.is_ok() {
            failure.disarm();
            self.count(&format!("{name}.successes"), 1);
            self.timing(&format!("{name}.duration"), elapsed_ms(start));
        }
        result
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Scoped wall-clock timer.
///
/// Emits exactly one timing line, either from [`Timer::stop`] or on drop,
/// which includes unwinding out of the guarded region.
#[must_use = "the timer emits when dropped; binding it to `_` stops it immediately"]
pub struct Timer<'a> {
    client: &'a StatsClient,
    key: String,
    start: Instant,
    stopped: bool,
}

impl Timer<'_> {
    /// Emit the timing now and return whether it was sent.
    pub fn stop(mut self) -> bool {
        self.finish()
    }

    fn finish(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.stopped = true;
        self.client.timing(&self.key, elapsed_ms(self.start))
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Emits a failure counter on drop unless disarmed; covers both `Err`
/// returns and panics.
struct FailureGuard<'a> {
    client: &'a StatsClient,
    key: String,
    armed: bool,
}

impl<'a> FailureGuard<'a> {
    fn arm(client: &'a StatsClient, key: String) -> Self {
        Self {
            client,
            key,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FailureGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.client.count(&self.key, 1);
        }
    }
}
