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

//! SPP Bridge
//!
//! Owns a single serial connection to a bonded Bluetooth peer, turns its
//! reads into telemetry and status records and forwards them, together with
//! connection lifecycle events, to a subscriber.

pub mod bluetooth;
pub mod bridge;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod state;

pub use bridge::{BridgeController, PeerList};
pub use error::BridgeError;
pub use events::{BridgeEvent, Subscriber};
