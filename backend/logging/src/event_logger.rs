//! Dispatch audit events.
//!
//! One structured record per stage of a bridged command, emitted through
//! `tracing` under the `dispatch_audit` target so file layers can pick them
//! out of the NDJSON stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// An envelope was handed to the host.
    Submitted { command: String, generic: bool },
    /// The host finished and the buffer was collected.
    Captured { command: String, units: usize },
    /// Dispatch ended without a usable result.
    Failed { command: String, reason: String },
    /// Captured replies were re-delivered to the origin.
    Forwarded { command: String, delivered: usize, total: usize },
}

#[derive(Debug, Serialize)]
pub struct DispatchLogEntry {
    pub origin: String,
    pub timestamp: DateTime<Utc>,
    pub event: DispatchEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Build and emit the audit record for `event`.
    pub fn log_event(origin: &str, event: DispatchEvent) -> DispatchLogEntry {
        let entry = DispatchLogEntry {
            origin: origin.to_string(),
            timestamp: Utc::now(),
            event,
        };

        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "dispatch_audit", entry = %json, "Dispatch event"),
            Err(e) => info!(target: "dispatch_audit", error = %e, "Unserializable dispatch event"),
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_tagged_event() {
        let entry = EventLogger::log_event(
            "telegram:FriendMessage:1",
            DispatchEvent::Captured {
                command: "/weather".into(),
                units: 2,
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["origin"], "telegram:FriendMessage:1");
        assert_eq!(json["event"]["type"], "captured");
        assert_eq!(json["event"]["units"], 2);
    }
}
