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

//! Bluetooth serial link handling.
//!
//! Connects to a bonded SPP peer and turns its byte stream into records.

#[cfg(feature = "bluez")]
mod bluez;
mod classifier;
mod framer;
pub mod mock;
mod session;
mod transport;

#[cfg(feature = "bluez")]
pub use bluez::{BluezDirectory, RfcommTransport};
pub use classifier::{classify, Classification, Record};
pub use framer::{FramerOptions, FramingMode, InvalidUtf8Policy, LineFramer};
pub use session::{
    resolve_peer, ConnectionSession, RunOutcome, SessionControl, SessionSettings,
};
pub use transport::{BoxStream, Peer, PeerDirectory, PeerSelector, SerialStream, Transport};
