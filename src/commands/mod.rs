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

//! Command surface of the bridge.
//!
//! Maps method names received from a host UI to controller calls.

use serde::Serialize;
use tracing::{debug, warn};

use crate::bridge::BridgeController;
use crate::events::{Subscriber, ERROR_PREFIX};

/// Commands a host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin listening to the configured peer.
    StartListening,
    /// Stop the active session.
    StopListening,
    /// List bonded peers.
    ListPeers,
}

impl Command {
    /// Parse from method name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "startListening" => Some(Self::StartListening),
            "stopListening" => Some(Self::StopListening),
            "getPairedDevices" | "listPeers" => Some(Self::ListPeers),
            _ => None,
        }
    }

    /// Get method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartListening => "startListening",
            Self::StopListening => "stopListening",
            Self::ListPeers => "getPairedDevices",
        }
    }
}

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", content = "value", rename_all = "snake_case")]
pub enum CommandReply {
    /// Short acknowledgment.
    Ack(String),
    /// Peer names, or a single `Error: ...` entry.
    Peers(Vec<String>),
    /// Error text.
    Error(String),
    /// The method name is unknown.
    NotImplemented(String),
}

impl CommandReply {
    /// Plain text form, one line per entry.
    pub fn to_text(&self) -> String {
        match self {
            Self::Ack(ack) => ack.clone(),
            Self::Peers(entries) => entries.join("\n"),
            Self::Error(message) => format!("{ERROR_PREFIX}{message}"),
            Self::NotImplemented(method) => format!("{ERROR_PREFIX}not implemented: {method}"),
        }
    }
}

/// Parse `method` and run it against `controller`.
///
/// Events of a started session go to `subscriber`.
pub async fn dispatch(
    controller: &BridgeController,
    method: &str,
    subscriber: &Subscriber,
) -> CommandReply {
    let Some(command) = Command::parse(method) else {
        warn!("Unknown command: {}", method.trim());
        return CommandReply::NotImplemented(method.trim().to_string());
    };

    execute(controller, command, subscriber).await
}

/// Run a parsed command.
pub async fn execute(
    controller: &BridgeController,
    command: Command,
    subscriber: &Subscriber,
) -> CommandReply {
    debug!("Executing command: {:?}", command);

    let result = match command {
        Command::StartListening => controller.start_listening(subscriber.clone()).await,
        Command::StopListening => controller.stop_listening().await,
        Command::ListPeers => {
            return CommandReply::Peers(controller.list_paired_peers().await.entries());
        }
    };

    match result {
        Ok(ack) => CommandReply::Ack(ack.to_string()),
        Err(e) => CommandReply::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::mock::{MockDirectory, MockTransport};
    use crate::bluetooth::Peer;
    use crate::config::Config;
    use std::sync::Arc;

    fn controller(directory: MockDirectory) -> BridgeController {
        BridgeController::from_config(
            Arc::new(directory),
            Arc::new(MockTransport::new()),
            &Config::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("startListening"), Some(Command::StartListening));
        assert_eq!(Command::parse(" stopListening\n"), Some(Command::StopListening));
        assert_eq!(Command::parse("getPairedDevices"), Some(Command::ListPeers));
        assert_eq!(Command::parse("listPeers"), Some(Command::ListPeers));
        assert_eq!(Command::parse("StartListening"), None);
        assert_eq!(Command::parse("reboot"), None);
        assert_eq!(Command::parse(Command::ListPeers.as_str()), Some(Command::ListPeers));
    }

    #[tokio::test]
    async fn test_dispatch_acks() {
        let bridge = controller(MockDirectory::new(vec![]));
        let (subscriber, _rx) = Subscriber::channel();

        assert_eq!(
            dispatch(&bridge, "stopListening", &subscriber).await,
            CommandReply::Ack("Listening stopped".to_string())
        );
        assert_eq!(
            dispatch(&bridge, "startListening", &subscriber).await,
            CommandReply::Ack("Listening started".to_string())
        );
        assert_eq!(
            dispatch(&bridge, "stopListening", &subscriber).await,
            CommandReply::Ack("Listening stopped".to_string())
        );
    }

    #[tokio::test]
    async fn test_dispatch_peers() {
        let bridge = controller(MockDirectory::new(vec![Peer::new("ESP32_BT", "24:6F:28:AA:BB:CC")]));
        let (subscriber, _rx) = Subscriber::channel();
        assert_eq!(
            dispatch(&bridge, "getPairedDevices", &subscriber).await,
            CommandReply::Peers(vec!["ESP32_BT".to_string()])
        );

        let bridge = controller(MockDirectory::new(vec![]).disabled());
        let reply = dispatch(&bridge, "getPairedDevices", &subscriber).await;
        assert_eq!(reply.to_text(), "Error: Bluetooth disabled");
    }

    #[tokio::test]
    async fn test_dispatch_unknown() {
        let bridge = controller(MockDirectory::new(vec![]));
        let (subscriber, _rx) = Subscriber::channel();
        let reply = dispatch(&bridge, "format", &subscriber).await;
        assert_eq!(reply, CommandReply::NotImplemented("format".to_string()));
        assert_eq!(reply.to_text(), "Error: not implemented: format");
    }
}
