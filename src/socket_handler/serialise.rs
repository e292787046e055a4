//! JSON event serialisation shared by the log transports.
//!
//! Each event becomes one line:
//! `{"@source_host", "@timestamp", "@tags", "@message", "@fields"}` followed
//! by `\n`. Structured key/values are merged into `@fields` but cannot
//! override the reserved field names.

use std::{collections::BTreeMap, io};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::log_record::LogEvent;

const RESERVED_FIELDS: [&str; 6] = [
    "level",
    "filename",
    "lineno",
    "method",
    "exception",
    "traceback",
];

#[derive(Serialize)]
struct JsonFields<'a> {
    level: &'a str,
    filename: &'a str,
    lineno: u32,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    traceback: Option<&'a str>,
    #[serde(flatten)]
    extra: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    #[serde(rename = "@source_host")]
    source_host: &'a str,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    #[serde(rename = "@tags")]
    tags: [&'a str; 1],
    #[serde(rename = "@message")]
    message: &'a str,
    #[serde(rename = "@fields")]
    fields: JsonFields<'a>,
}

impl<'a> JsonEvent<'a> {
    fn new(event: &'a LogEvent, source_host: &'a str) -> Self {
        let timestamp = DateTime::<Utc>::from(event.metadata.timestamp)
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let extra = event
            .metadata
            .key_values
            .iter()
            .filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let exception = event.exception.as_ref();
        Self {
            source_host,
            timestamp,
            tags: [event.channel.as_str()],
            message: &event.message,
            fields: JsonFields {
                level: event.level.as_str(),
                filename: &event.metadata.filename,
                lineno: event.metadata.line_number,
                method: &event.metadata.function,
                exception: exception.map(|e| e.kind.as_str()),
                traceback: exception.map(|e| e.traceback.as_str()),
                extra,
            },
        }
    }
}

/// Serialise an event into a newline-terminated JSON line.
pub fn serialise_event(event: &LogEvent, source_host: &str) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);
    serde_json::to_writer(&mut buf, &JsonEvent::new(event, source_host))
        .map_err(io::Error::other)?;
    buf.push(b'\n');
    Ok(buf)
}
