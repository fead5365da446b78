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

//! Bridge state management.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bluetooth::{Peer, Record};

/// Connection status as reported to the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Errored,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "Idle",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Errored => "Error",
        }
    }
}

/// Point-in-time copy of [`BridgeState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    pub peer: Option<Peer>,
    pub last_record: Option<Record>,
    pub records_received: u64,
}

/// Shared bridge state.
#[derive(Debug)]
pub struct BridgeState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Connected peer.
    pub connected_peer: RwLock<Option<Peer>>,

    /// Most recent record.
    pub last_record: RwLock<Option<Record>>,

    records_received: AtomicU64,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::Idle),
            connected_peer: RwLock::new(None),
            last_record: RwLock::new(None),
            records_received: AtomicU64::new(0),
        }
    }
}

impl BridgeState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connecting(&self) {
        *self.connection_status.write() = ConnectionStatus::Connecting;
        *self.connected_peer.write() = None;
    }

    pub fn set_connected(&self, peer: Peer) {
        *self.connection_status.write() = ConnectionStatus::Connected;
        *self.connected_peer.write() = Some(peer);
    }

    pub fn set_disconnected(&self) {
        *self.connection_status.write() = ConnectionStatus::Disconnected;
        *self.connected_peer.write() = None;
    }

    /// Errored is terminal for the session but keeps being reported.
    pub fn set_error(&self) {
        *self.connection_status.write() = ConnectionStatus::Errored;
        *self.connected_peer.write() = None;
    }

    pub fn record_received(&self, record: &Record) {
        *self.last_record.write() = Some(record.clone());
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn get_peer(&self) -> Option<Peer> {
        self.connected_peer.read().clone()
    }

    pub fn get_last_record(&self) -> Option<Record> {
        self.last_record.read().clone()
    }

    pub fn records_received(&self) -> u64 {
        self.records_received.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.get_status(),
            peer: self.get_peer(),
            last_record: self.get_last_record(),
            records_received: self.records_received(),
        }
    }
}
