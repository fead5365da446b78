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

//! Bridge error taxonomy.

use thiserror::Error;

/// Errors produced while opening or driving a bridge session.
///
/// The `Display` text of each variant is what subscribers see as the
/// reason of an `Error` event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Bluetooth not available on this device")]
    AdapterUnavailable,

    #[error("Bluetooth disabled, enable it and try again")]
    AdapterDisabled,

    #[error("device '{filter}' not found, make sure it is paired and powered on")]
    DeviceNotFound { filter: String },

    #[error("could not connect to {peer}: {reason}")]
    ConnectFailed { peer: String, reason: String },

    #[error("error reading data: {0}")]
    ReadFailed(String),

    /// Never fatal: the framer either replaces or skips undecodable bytes.
    #[error("received {bytes} bytes that are not valid UTF-8")]
    DecodeFailed { bytes: usize },

    /// Resolved internally by stopping the previous session first.
    #[error("already listening")]
    AlreadyListening,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Listening was requested outside a tokio runtime.
    #[error("no async runtime available to run the session")]
    NoRuntime,
}
