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

//! Platform collaborators: the bonded-peer directory and the serial transport.

use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// A remote device already bonded with the local adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub name: String,
    pub address: String,
}

impl Peer {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Which bonded peer a session should bind to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSelector {
    /// Exact name match.
    Name(String),
    /// Address match, ignoring case.
    Address(String),
}

impl PeerSelector {
    pub fn matches(&self, peer: &Peer) -> bool {
        match self {
            Self::Name(name) => peer.name == *name,
            Self::Address(address) => peer.address.eq_ignore_ascii_case(address),
        }
    }
}

impl fmt::Display for PeerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Address(address) => f.write_str(address),
        }
    }
}

/// Byte stream of a connected serial link.
///
/// Dropping the stream closes the underlying connection.
pub trait SerialStream: AsyncRead + Send + Unpin {
    /// Whether the link still reports a connected peer.
    fn is_connected(&self) -> bool;
}

/// Owned, type-erased serial stream.
pub type BoxStream = Box<dyn SerialStream>;

/// Local adapter and its bonded peers.
pub trait PeerDirectory: Send + Sync {
    /// Whether a local radio exists.
    fn adapter_present(&self) -> BoxFuture<'_, Result<bool>>;

    /// Whether the local radio is powered.
    fn adapter_enabled(&self) -> BoxFuture<'_, Result<bool>>;

    /// Peers bonded with the local adapter.
    fn bonded_peers(&self) -> BoxFuture<'_, Result<Vec<Peer>>>;
}

/// Opens serial links to peers.
pub trait Transport: Send + Sync {
    /// Connect to `service` on `peer`. No timeout is applied.
    fn connect<'a>(&'a self, peer: &'a Peer, service: Uuid) -> BoxFuture<'a, Result<BoxStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matching() {
        let peer = Peer::new("ESP32_BT", "24:6F:28:AA:BB:CC");

        assert!(PeerSelector::Name("ESP32_BT".into()).matches(&peer));
        assert!(!PeerSelector::Name("esp32_bt".into()).matches(&peer));
        assert!(PeerSelector::Address("24:6f:28:aa:bb:cc".into()).matches(&peer));
        assert!(!PeerSelector::Address("00:00:00:00:00:00".into()).matches(&peer));
    }

    #[test]
    fn test_peer_display() {
        let peer = Peer::new("HC-05", "98:D3:31:00:00:01");
        assert_eq!(peer.to_string(), "HC-05 (98:D3:31:00:00:01)");
    }
}
