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

//! A single connection to one peer's serial stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::classifier::Record;
use super::framer::{FramerOptions, LineFramer};
use super::transport::{BoxStream, Peer, PeerDirectory, PeerSelector, Transport};
use crate::error::BridgeError;
use crate::events::BridgeEvent;
use crate::state::ConnectionStatus;

/// Running flag and cancellation signal shared by a session's worker and
/// whoever may stop it.
#[derive(Debug)]
pub struct SessionControl {
    running: AtomicBool,
    notify: Notify,
}

impl SessionControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            notify: Notify::new(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request the session to stop. Returns `false` if it was already stopped.
    pub fn close(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.notify.notify_waiters();
        was_running
    }

    /// Resolves once [`SessionControl::close`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

/// Parameters needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub selector: PeerSelector,
    pub service: Uuid,
    pub framer: FramerOptions,
    pub read_buffer_size: usize,
}

/// Why a session's read loop returned.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Stopped through its [`SessionControl`].
    Cancelled,
    /// The peer closed the stream.
    PeerClosed,
    /// Reading failed while the session was listening.
    Failed(BridgeError),
}

/// Find the bonded peer matching `selector`.
pub async fn resolve_peer(
    directory: &dyn PeerDirectory,
    selector: &PeerSelector,
) -> Result<Peer, BridgeError> {
    let present = directory.adapter_present().await.map_err(|e| {
        warn!("Adapter query failed: {}", e);
        BridgeError::AdapterUnavailable
    })?;
    if !present {
        return Err(BridgeError::AdapterUnavailable);
    }

    let enabled = directory.adapter_enabled().await.map_err(|e| {
        warn!("Adapter power query failed: {}", e);
        BridgeError::AdapterUnavailable
    })?;
    if !enabled {
        return Err(BridgeError::AdapterDisabled);
    }

    info!("Looking for device '{}'", selector);
    let peers = directory.bonded_peers().await.map_err(|e| {
        warn!("Listing bonded devices failed: {}", e);
        BridgeError::AdapterUnavailable
    })?;
    debug!(
        "Bonded devices: {}",
        peers
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    peers
        .into_iter()
        .find(|peer| selector.matches(peer))
        .ok_or_else(|| BridgeError::DeviceNotFound {
            filter: selector.to_string(),
        })
}

/// Owns the stream of one connected peer and reads records from it.
pub struct ConnectionSession {
    peer: Peer,
    stream: Option<BoxStream>,
    framer: LineFramer,
    read_buffer_size: usize,
    control: Arc<SessionControl>,
    status: ConnectionStatus,
}

impl ConnectionSession {
    /// Resolve the configured peer and connect to it.
    pub async fn open(
        directory: &dyn PeerDirectory,
        transport: &dyn Transport,
        settings: &SessionSettings,
        control: Arc<SessionControl>,
    ) -> Result<Self, BridgeError> {
        let peer = resolve_peer(directory, &settings.selector).await?;
        info!("Device found, connecting to {}", peer);

        let stream = transport
            .connect(&peer, settings.service)
            .await
            .map_err(|e| BridgeError::ConnectFailed {
                peer: peer.name.clone(),
                reason: e.to_string(),
            })?;

        if !stream.is_connected() {
            return Err(BridgeError::ConnectFailed {
                peer: peer.name.clone(),
                reason: "stream is not connected".to_string(),
            });
        }

        info!("Connected to {}", peer);
        Ok(Self::from_stream(peer, stream, settings, control))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(
        peer: Peer,
        stream: BoxStream,
        settings: &SessionSettings,
        control: Arc<SessionControl>,
    ) -> Self {
        Self {
            peer,
            stream: Some(stream),
            framer: LineFramer::new(settings.framer),
            read_buffer_size: settings.read_buffer_size.max(1),
            control,
            status: ConnectionStatus::Connected,
        }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether the stream has not been released yet.
    pub fn holds_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Read until cancelled, closed by the peer, or failed.
    ///
    /// Records and a read failure are passed to `emit`. A read error that
    /// arrives after [`SessionControl::close`] is the expected result of the
    /// stop and is not reported.
    pub async fn run(&mut self, emit: &mut (dyn FnMut(BridgeEvent) + Send)) -> RunOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return RunOutcome::Cancelled;
        };

        info!("Listening to {}", self.peer);
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            if !self.control.is_running() {
                self.status = ConnectionStatus::Disconnected;
                return RunOutcome::Cancelled;
            }

            let read = tokio::select! {
                biased;
                _ = self.control.cancelled() => {
                    debug!("Read loop cancelled");
                    self.status = ConnectionStatus::Disconnected;
                    return RunOutcome::Cancelled;
                }
                read = stream.read(&mut buf) => read,
            };

            match read {
                Ok(0) => {
                    info!("Connection closed by remote");
                    if let Some(text) = self.framer.finish() {
                        emit(BridgeEvent::Record(Record::new(text)));
                    }
                    self.control.close();
                    self.status = ConnectionStatus::Disconnected;
                    return RunOutcome::PeerClosed;
                }
                Ok(n) => {
                    let failures = self.framer.decode_failures();
                    let records = self.framer.push(&buf[..n]);
                    if self.framer.decode_failures() > failures {
                        warn!("{}", BridgeError::DecodeFailed { bytes: n });
                    }
                    for text in records {
                        let record = Record::new(text);
                        debug!("Received: {:?}", record.classification);
                        emit(BridgeEvent::Record(record));
                    }
                }
                Err(e) => {
                    // Only the caller that flips the flag reports the failure.
                    if !self.control.close() {
                        debug!("Read interrupted by stop: {}", e);
                        self.status = ConnectionStatus::Disconnected;
                        return RunOutcome::Cancelled;
                    }

                    error!("Read error: {}", e);
                    let err = BridgeError::ReadFailed(e.to_string());
                    emit(BridgeEvent::Error(err.clone()));
                    self.status = ConnectionStatus::Errored;
                    return RunOutcome::Failed(err);
                }
            }
        }
    }

    /// Release the stream. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            self.framer.reset();
            info!("Stream to {} released", self.peer);
        }
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.control.close();
        self.release();
    }
}
