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

//! BlueZ peer directory and RFCOMM transport.

use anyhow::{anyhow, Result};
use bluer::rfcomm::{SocketAddr, Stream};
use bluer::{Address, Session};
use futures::future::BoxFuture;
use tracing::{debug, info};
use uuid::Uuid;

use super::transport::{BoxStream, Peer, PeerDirectory, SerialStream, Transport};

/// Bonded devices of the default BlueZ adapter.
pub struct BluezDirectory {
    session: Session,
}

impl BluezDirectory {
    /// Create a new BlueZ session.
    pub async fn new() -> Result<Self> {
        let session = Session::new().await?;
        info!("BlueZ session created");
        Ok(Self { session })
    }
}

impl PeerDirectory for BluezDirectory {
    fn adapter_present(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            match self.session.default_adapter().await {
                Ok(adapter) => {
                    debug!("Using Bluetooth adapter: {}", adapter.name());
                    Ok(true)
                }
                Err(e) => {
                    debug!("No default adapter: {}", e);
                    Ok(false)
                }
            }
        })
    }

    fn adapter_enabled(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let adapter = self.session.default_adapter().await?;
            Ok(adapter.is_powered().await?)
        })
    }

    fn bonded_peers(&self) -> BoxFuture<'_, Result<Vec<Peer>>> {
        Box::pin(async move {
            let adapter = self.session.default_adapter().await?;
            let mut peers = Vec::new();

            for addr in adapter.device_addresses().await? {
                let device = adapter.device(addr)?;
                if device.is_paired().await? {
                    let name = device.alias().await.unwrap_or_else(|_| addr.to_string());
                    peers.push(Peer::new(name, addr.to_string()));
                }
            }

            Ok(peers)
        })
    }
}

/// RFCOMM client connecting to a fixed channel on the peer.
pub struct RfcommTransport {
    channel: u8,
}

impl RfcommTransport {
    pub fn new(channel: u8) -> Self {
        Self { channel }
    }
}

impl Transport for RfcommTransport {
    fn connect<'a>(&'a self, peer: &'a Peer, service: Uuid) -> BoxFuture<'a, Result<BoxStream>> {
        Box::pin(async move {
            let address: Address = peer
                .address
                .parse()
                .map_err(|e| anyhow!("invalid address {}: {:?}", peer.address, e))?;

            info!(
                "Connecting RFCOMM channel {} on {} (service {})",
                self.channel, address, service
            );
            let stream = Stream::connect(SocketAddr::new(address, self.channel)).await?;
            Ok(Box::new(stream) as BoxStream)
        })
    }
}

impl SerialStream for Stream {
    fn is_connected(&self) -> bool {
        self.peer_addr().is_ok()
    }
}
