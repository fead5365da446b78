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

//! Bridge controller: starts, replaces and stops the single listening
//! session and forwards its events to a subscriber.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bluetooth::{
    ConnectionSession, Peer, PeerDirectory, PeerSelector, RunOutcome, SessionControl,
    SessionSettings, Transport,
};
use crate::config::Config;
use crate::error::BridgeError;
use crate::events::{BridgeEvent, Subscriber, ERROR_PREFIX};
use crate::state::{BridgeState, ConnectionStatus};

/// Acknowledgment of a start request.
pub const LISTENING_STARTED: &str = "Listening started";

/// Acknowledgment of a stop request.
pub const LISTENING_STOPPED: &str = "Listening stopped";

/// Result of listing bonded peers. Failures are carried, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum PeerList {
    Peers(Vec<Peer>),
    Error(String),
}

impl PeerList {
    /// Peer names, or a single `Error: ...` entry.
    pub fn entries(&self) -> Vec<String> {
        match self {
            PeerList::Peers(peers) => peers.iter().map(|p| p.name.clone()).collect(),
            PeerList::Error(message) => vec![format!("{ERROR_PREFIX}{message}")],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PeerList::Error(_))
    }
}

/// The session currently owned by the controller.
struct ActiveSession {
    id: u64,
    control: Arc<SessionControl>,
    worker: JoinHandle<()>,
    subscriber: Subscriber,
}

/// Public entry point of the bridge.
///
/// Holds at most one session. Starting while a session is active stops it
/// completely, including its `Disconnected` event, before the new one
/// begins.
pub struct BridgeController {
    directory: Arc<dyn PeerDirectory>,
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
    state: Arc<BridgeState>,
    slot: Mutex<Option<ActiveSession>>,
    next_session: AtomicU64,
}

impl BridgeController {
    /// Create a controller over the given collaborators.
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        transport: Arc<dyn Transport>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            directory,
            transport,
            settings,
            state: BridgeState::new(),
            slot: Mutex::new(None),
            next_session: AtomicU64::new(0),
        }
    }

    /// Create a controller from validated configuration.
    pub fn from_config(
        directory: Arc<dyn PeerDirectory>,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let settings = SessionSettings {
            selector: config.bluetooth.selector(),
            service: config.bluetooth.service_uuid,
            framer: config.framing.framer_options()?,
            read_buffer_size: config.framing.read_buffer_size,
        };
        Ok(Self::new(directory, transport, settings))
    }

    /// Shared status of the bridge.
    pub fn state(&self) -> &Arc<BridgeState> {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.get_status()
    }

    /// Whether a session worker is still running.
    pub async fn is_listening(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|active| !active.worker.is_finished())
            .unwrap_or(false)
    }

    /// Start listening to the configured peer.
    ///
    /// Returns once the session is requested. Whether the connection
    /// succeeds is reported to `subscriber` as events.
    pub async fn start_listening(&self, subscriber: Subscriber) -> Result<&'static str, BridgeError> {
        let selector = self.settings.selector.clone();
        self.start_listening_to(selector, subscriber).await
    }

    /// Start listening to the peer matching `selector`.
    pub async fn start_listening_to(
        &self,
        selector: PeerSelector,
        subscriber: Subscriber,
    ) -> Result<&'static str, BridgeError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        let mut slot = self.slot.lock().await;

        if let Some(active) = slot.as_mut() {
            debug!(
                session = active.id,
                "{}, stopping previous session",
                BridgeError::AlreadyListening
            );
            shutdown(active, &self.state).await;
            *slot = None;
        }

        let id = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let control = SessionControl::new();
        let settings = SessionSettings {
            selector,
            ..self.settings.clone()
        };

        let worker = handle.spawn(drive(
            id,
            self.directory.clone(),
            self.transport.clone(),
            settings,
            control.clone(),
            subscriber.clone(),
            self.state.clone(),
        ));

        *slot = Some(ActiveSession {
            id,
            control,
            worker,
            subscriber,
        });
        info!(session = id, "Listening started");
        Ok(LISTENING_STARTED)
    }

    /// Stop the active session, if any.
    ///
    /// When this returns the stream is released and the session's
    /// `Disconnected` event has been delivered.
    pub async fn stop_listening(&self) -> Result<&'static str, BridgeError> {
        let mut slot = self.slot.lock().await;
        match slot.as_mut() {
            Some(active) => {
                shutdown(active, &self.state).await;
                *slot = None;
            }
            None => debug!("Stop requested with no active session"),
        }
        Ok(LISTENING_STOPPED)
    }

    /// List peers bonded with the local adapter.
    pub async fn list_paired_peers(&self) -> PeerList {
        match AssertUnwindSafe(self.query_peers()).catch_unwind().await {
            Ok(Ok(peers)) => {
                debug!("{} paired devices", peers.len());
                PeerList::Peers(peers)
            }
            Ok(Err(message)) => {
                warn!("Listing paired devices failed: {}", message);
                PeerList::Error(message)
            }
            Err(_) => {
                error!("Peer directory panicked while listing devices");
                PeerList::Error("peer directory failed unexpectedly".to_string())
            }
        }
    }

    async fn query_peers(&self) -> Result<Vec<Peer>, String> {
        if !self.directory.adapter_present().await.map_err(|e| e.to_string())? {
            return Err("Bluetooth not available".to_string());
        }
        if !self.directory.adapter_enabled().await.map_err(|e| e.to_string())? {
            return Err("Bluetooth disabled".to_string());
        }
        self.directory.bonded_peers().await.map_err(|e| e.to_string())
    }
}

impl Drop for BridgeController {
    fn drop(&mut self) {
        // The worker observes the close, releases its stream and emits
        // `Disconnected` on its own.
        if let Some(active) = self.slot.get_mut().take() {
            if active.control.close() {
                info!(session = active.id, "Controller dropped, closing session");
            }
        }
    }
}

/// Close a session and wait for its worker to finish.
///
/// The session stays in the slot until this returns, so a caller that gives
/// up on the wait leaves it for the next start or stop to finish.
async fn shutdown(active: &mut ActiveSession, state: &BridgeState) {
    if active.control.close() {
        info!(session = active.id, "Stopping session");
    }

    if let Err(e) = (&mut active.worker).await {
        warn!(session = active.id, "Session worker ended abnormally: {}", e);
        state.set_disconnected();
        active.subscriber.emit(BridgeEvent::Disconnected);
    }
}

/// Body of a session worker: open, read until done, release, report.
async fn drive(
    id: u64,
    directory: Arc<dyn PeerDirectory>,
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
    control: Arc<SessionControl>,
    subscriber: Subscriber,
    state: Arc<BridgeState>,
) {
    info!(session = id, "Starting connection to '{}'", settings.selector);
    state.set_connecting();
    subscriber.emit(BridgeEvent::Connecting);

    let opened = tokio::select! {
        biased;
        _ = control.cancelled() => None,
        opened = ConnectionSession::open(
            directory.as_ref(),
            transport.as_ref(),
            &settings,
            control.clone(),
        ) => Some(opened),
    };

    match opened {
        None => {
            info!(session = id, "Stopped while connecting");
            state.set_disconnected();
        }
        Some(Err(err)) => {
            error!(session = id, "Connection failed: {}", err);
            state.set_error();
            subscriber.emit(BridgeEvent::Error(err));
        }
        Some(Ok(mut session)) => {
            let peer = session.peer().clone();
            state.set_connected(peer.clone());
            subscriber.emit(BridgeEvent::Connected { peer });

            let outcome = session
                .run(&mut |event: BridgeEvent| {
                    if let BridgeEvent::Record(record) = &event {
                        state.record_received(record);
                    }
                    subscriber.emit(event);
                })
                .await;
            session.release();

            match outcome {
                RunOutcome::Failed(_) => state.set_error(),
                RunOutcome::Cancelled | RunOutcome::PeerClosed => state.set_disconnected(),
            }
        }
    }

    subscriber.emit(BridgeEvent::Disconnected);
    info!(session = id, "Session ended");
}
