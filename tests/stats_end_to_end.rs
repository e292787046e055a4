//! Stats emission against a local TCP collector configured from JSON.

use std::{
    io::{BufRead, BufReader},
    net::TcpListener,
    sync::mpsc,
    thread,
    time::Duration,
};

use clay_telemetry::{StatsClient, StatsProtocol, TelemetryConfig};
use rstest::rstest;
use serde_json::json;

fn spawn_collector(expected: usize) -> (u16, mpsc::Receiver<String>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind collector");
    let port = listener.local_addr().expect("collector addr").port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept stats client");
        let mut reader = BufReader::new(stream);
        for _ in 0..expected {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    (port, rx)
}

#[rstest]
fn tcp_collector_receives_counter_lines() {
    let (port, lines) = spawn_collector(2);
    let config = TelemetryConfig::from_value(json!({
        "statsd": {"host": "127.0.0.1", "port": port, "protocol": "tcp"}
    }))
    .expect("config");
    let client = StatsClient::from_config(&config);
    assert_eq!(
        client.connection().settings().map(|s| s.protocol.clone()),
        Some(StatsProtocol::Tcp)
    );

    assert!(client.count("foo", 1));
    assert!(client.count_sampled("foo", 1, 0.5));

    let timeout = Duration::from_secs(2);
    assert_eq!(lines.recv_timeout(timeout).expect("first line"), "foo:1|c\n");
    assert_eq!(
        lines.recv_timeout(timeout).expect("second line"),
        "foo:1|c|@0.500000\n"
    );
}

#[rstest]
fn unconfigured_stats_are_silent() {
    let client = StatsClient::from_config(&TelemetryConfig::default());
    assert!(!client.count("foo", 1));
    assert_eq!(client.wrap("job", || Ok::<_, ()>(7)), Ok(7));
}
