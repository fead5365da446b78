// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bridge events and their delivery to a subscriber.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::bluetooth::{Classification, Peer, Record};
use crate::error::BridgeError;

/// Prefix of lifecycle and status lines in the single-string convention.
pub const STATUS_PREFIX: &str = "Connected: ";

/// Prefix of error lines in the single-string convention.
pub const ERROR_PREFIX: &str = "Error: ";

/// Events emitted for a session, in the order they occur.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A session was requested and is resolving its peer.
    Connecting,
    /// The peer's stream reports connected.
    Connected { peer: Peer },
    /// A record was read from the peer.
    Record(Record),
    /// The session failed.
    Error(BridgeError),
    /// The session ended. Nothing follows for that session.
    Disconnected,
}

impl BridgeEvent {
    /// Encode as a tagged wire message.
    pub fn to_wire(&self) -> WireMessage {
        let (kind, status, payload) = match self {
            Self::Connecting => (
                WireKind::Status,
                Some(WireStatus::Connecting),
                "Starting connection".to_string(),
            ),
            Self::Connected { peer } => (
                WireKind::Status,
                Some(WireStatus::Connected),
                format!("Connection established with {}", peer.name),
            ),
            Self::Record(record) => match &record.classification {
                Classification::Telemetry(_) => (WireKind::Telemetry, None, record.raw.clone()),
                Classification::Status(text) => {
                    (WireKind::Status, Some(WireStatus::Connected), text.clone())
                }
            },
            Self::Error(err) => (WireKind::Status, Some(WireStatus::Error), err.to_string()),
            Self::Disconnected => (
                WireKind::Status,
                Some(WireStatus::Disconnected),
                "Connection closed".to_string(),
            ),
        };

        WireMessage {
            kind,
            status,
            payload,
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Encode in the single-string convention: telemetry is the bare
    /// number, everything else carries a reserved prefix.
    pub fn to_legacy_line(&self) -> String {
        match self {
            Self::Connecting => format!("{STATUS_PREFIX}Starting connection..."),
            Self::Connected { peer } => {
                format!("{STATUS_PREFIX}Connection established with {}", peer.name)
            }
            Self::Record(record) => match &record.classification {
                Classification::Telemetry(_) => record.raw.clone(),
                Classification::Status(text) => {
                    format!("{STATUS_PREFIX}Received non-numeric data: {text}")
                }
            },
            Self::Error(err) => format!("{ERROR_PREFIX}{err}"),
            Self::Disconnected => format!("{STATUS_PREFIX}Connection closed"),
        }
    }
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_legacy_line())
    }
}

/// Payload kind of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKind {
    Status,
    Telemetry,
}

/// Lifecycle status carried by status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireStatus {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

/// One event as sent to consumers outside the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub kind: WireKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WireStatus>,
    pub payload: String,
    /// Unix time in milliseconds.
    pub ts: i64,
}

impl WireMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Receives the events of every session started with it.
///
/// Delivery is synchronous and in order; a subscriber must not block.
#[derive(Clone)]
pub struct Subscriber {
    sink: Arc<dyn Fn(BridgeEvent) + Send + Sync>,
}

impl Subscriber {
    /// Deliver events to a callback.
    pub fn new(sink: impl Fn(BridgeEvent) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Deliver events into a channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Self::new(move |event| {
            // A dropped receiver just means nobody is listening anymore.
            let _ = tx.send(event);
        });
        (subscriber, rx)
    }

    /// Emit an event.
    pub fn emit(&self, event: BridgeEvent) {
        (self.sink)(event);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_lines() {
        assert_eq!(
            BridgeEvent::Record(Record::new("42")).to_legacy_line(),
            "42"
        );
        assert_eq!(
            BridgeEvent::Record(Record::new("ok")).to_legacy_line(),
            "Connected: Received non-numeric data: ok"
        );
        assert_eq!(
            BridgeEvent::Error(BridgeError::AdapterDisabled).to_legacy_line(),
            "Error: Bluetooth disabled, enable it and try again"
        );
        assert!(BridgeEvent::Disconnected
            .to_legacy_line()
            .starts_with(STATUS_PREFIX));
    }

    #[test]
    fn test_wire_telemetry_has_no_status() {
        let wire = BridgeEvent::Record(Record::new("-3")).to_wire();
        assert_eq!(wire.kind, WireKind::Telemetry);
        assert_eq!(wire.status, None);
        assert_eq!(wire.payload, "-3");

        let json = wire.to_json().unwrap();
        assert!(json.contains("\"kind\":\"telemetry\""));
        assert!(!json.contains("\"status\""));
    }

    #[test]
    fn test_wire_json_parses_back() {
        let peer = Peer::new("ESP32_BT", "24:6F:28:AA:BB:CC");
        let wire = BridgeEvent::Connected { peer }.to_wire();
        let parsed = WireMessage::from_json(&wire.to_json().unwrap()).unwrap();

        assert_eq!(parsed, wire);
        assert_eq!(parsed.status, Some(WireStatus::Connected));
        assert!(parsed.payload.contains("ESP32_BT"));
    }

    #[test]
    fn test_channel_subscriber_preserves_order() {
        let (subscriber, mut rx) = Subscriber::channel();
        subscriber.emit(BridgeEvent::Connecting);
        subscriber.clone().emit(BridgeEvent::Disconnected);

        assert_eq!(rx.try_recv().unwrap(), BridgeEvent::Connecting);
        assert_eq!(rx.try_recv().unwrap(), BridgeEvent::Disconnected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (subscriber, rx) = Subscriber::channel();
        drop(rx);
        subscriber.emit(BridgeEvent::Connecting);
    }
}
