//! End-to-end test of the `log` bridge shipping JSON over TCP.
//!
//! Installs the global logger, so this binary holds a single test.
#![cfg(feature = "log-compat")]

use std::{
    io::{BufRead, BufReader},
    net::TcpListener,
    sync::mpsc,
    thread,
    time::Duration,
};

use clay_telemetry::{TelemetryConfig, install_remote_logging};
use serde_json::{Value, json};

#[test]
fn remote_logging_ships_log_records() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind collector");
    let port = listener.local_addr().expect("collector addr").port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept shipper");
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let config = TelemetryConfig::from_value(json!({
        "logging": {"host": format!("127.0.0.1:{port}"), "protocol": "tcp", "level": "info"}
    }))
    .expect("config");
    let handler = install_remote_logging(&config)
        .expect("handler builds")
        .expect("logger installed");

    log::debug!(target: "orders", "below threshold");
    log::warn!(target: "orders::billing", "payment declined");
    assert!(handler.flush(), "flush should reach the worker");

    let line = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("collector received an event");
    let event: Value = serde_json::from_str(&line).expect("json event");
    assert_eq!(event["@tags"], json!(["orders.billing"]));
    assert_eq!(event["@message"], json!("payment declined"));
    assert_eq!(event["@fields"]["level"], json!("WARNING"));
    assert!(event["@fields"]["lineno"].as_u64().is_some());

    let second = install_remote_logging(&config).expect("handler builds");
    assert!(second.is_none(), "a second install must not replace the logger");

    handler.close();
}
