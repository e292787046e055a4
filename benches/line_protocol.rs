//! Benchmarks for stats line formatting and event serialisation.

use std::hint::black_box;

use clay_telemetry::{
    Level, LogEvent, StatsClient, StatsConnection,
    stats::protocol::{format_counter, format_timing, is_valid_key},
};
use criterion::{Criterion, criterion_group, criterion_main};

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_protocol");
    group.bench_function("format_counter", |b| {
        b.iter(|| format_counter(black_box("api.requests"), black_box(3), black_box(1.0)))
    });
    group.bench_function("format_counter_sampled", |b| {
        b.iter(|| format_counter(black_box("api.requests"), black_box(3), black_box(0.25)))
    });
    group.bench_function("format_timing", |b| {
        b.iter(|| format_timing(black_box("api.latency"), black_box(12.75)))
    });
    group.bench_function("is_valid_key", |b| {
        b.iter(|| is_valid_key(black_box("service.handler.response_time")))
    });
    group.finish();
}

fn bench_disabled_client(c: &mut Criterion) {
    let client = StatsClient::new(StatsConnection::disabled());
    c.bench_function("disabled_client_count", |b| {
        b.iter(|| client.count(black_box("api.requests"), 1))
    });
}

fn bench_event_display(c: &mut Criterion) {
    c.bench_function("log_event_new", |b| {
        b.iter(|| LogEvent::new(black_box("api"), Level::Warning, black_box("slow request")))
    });
}

criterion_group!(benches, bench_format, bench_disabled_client, bench_event_display);
criterion_main!(benches);
