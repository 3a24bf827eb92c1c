//! JSON-lines rendering for notifications.
//!
//! Every line is one object with a `channel` field naming where it came
//! from; the notification's own fields sit next to it.

use std::io::Write;

use serde::Serialize;
use serde_json::{Map, Value};

use esplink_core::Notification;

use crate::error::CliError;

/// Channel name a notification is printed under.
pub fn channel(note: &Notification) -> &'static str {
    match note {
        Notification::Status(_) => "status",
        Notification::State(_) => "state",
        Notification::Ble(_) => "ble",
        Notification::Diagnostic(_) => "diagnostic",
    }
}

/// One JSON line for `note`.
pub fn render(note: &Notification) -> Result<String, CliError> {
    let channel = channel(note);
    match note {
        Notification::Status(status) => tagged(channel, &serde_json::json!({ "status": status })),
        Notification::State(state) => tagged(channel, state),
        Notification::Ble(beacon) => tagged(channel, beacon),
        Notification::Diagnostic(diag) => tagged(channel, diag),
    }
}

/// Serialize `value` as an object and add `"channel": channel`.
pub fn tagged(channel: &str, value: &impl Serialize) -> Result<String, CliError> {
    let mut map = match serde_json::to_value(value)? {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    };
    map.insert("channel".into(), Value::String(channel.into()));
    Ok(serde_json::to_string(&map)?)
}

/// Write one line to stdout and flush, so piped consumers see it at once.
pub fn emit(line: &str) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}
