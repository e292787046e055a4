//! Statsd line protocol formatting.
//!
//! Lines take the form `key:value|type[|@sample]`. Floating point values are
//! rendered with six fractional digits; counters stay integral.

use std::fmt::{self, Display, Write};

/// Metric types understood by the collector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatKind {
    Counter,
    Timing,
    Gauge,
    Set,
}

impl StatKind {
    pub fn suffix(self) -> &'static str {
        match self {
            StatKind::Counter => "c",
            StatKind::Timing => "ms",
            StatKind::Gauge => "g",
            StatKind::Set => "s",
        }
    }
}

impl Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Whether `key` can be embedded in a line without corrupting it.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| matches!(c, ':' | '|' | '@') || c.is_whitespace() || c.is_control())
}

fn line(key: &str, value: impl Display, kind: StatKind) -> String {
    let mut out = String::with_capacity(key.len() + 16);
    // Writing into a String cannot fail.
    let _ = write!(out, "{key}:{value}|{kind}");
    out
}

/// `key:count|c`, with `|@sample` appended when `sample < 1.0`.
pub fn format_counter(key: &str, count: i64, sample: f64) -> String {
    let mut out = line(key, count, StatKind::Counter);
    if sample < 1.0 {
        let _ = write!(out, "|@{sample:.6}");
    }
    out
}

/// `key:ms|ms` with `ms` in fixed-point notation.
pub fn format_timing(key: &str, millis: f64) -> String {
    line(key, format_args!("{millis:.6}"), StatKind::Timing)
}

pub fn format_gauge(key: &str, value: f64) -> String {
    line(key, format_args!("{value:.6}"), StatKind::Gauge)
}

/// `key:member|s`; the member is rendered verbatim.
pub fn format_set(key: &str, member: impl Display) -> String {
    line(key, member, StatKind::Set)
}
