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

//! In-memory peer directory and transport.
//!
//! Lets tests and demos drive the bridge without a Bluetooth adapter.

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use uuid::Uuid;

use super::transport::{BoxStream, Peer, PeerDirectory, SerialStream, Transport};

/// Peer directory with a fixed adapter state.
#[derive(Debug, Clone)]
pub struct MockDirectory {
    present: bool,
    enabled: bool,
    peers: Vec<Peer>,
    failure: Option<String>,
}

impl MockDirectory {
    /// Present, enabled adapter bonded with `peers`.
    pub fn new(peers: Vec<Peer>) -> Self {
        Self {
            present: true,
            enabled: true,
            peers,
            failure: None,
        }
    }

    /// No local radio.
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new(Vec::new())
        }
    }

    /// Every query fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Radio present but powered off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

impl PeerDirectory for MockDirectory {
    fn adapter_present(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.present)
        })
    }

    fn adapter_enabled(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.present && self.enabled)
        })
    }

    fn bonded_peers(&self) -> BoxFuture<'_, Result<Vec<Peer>>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.peers.clone())
        })
    }
}

enum Connect {
    Stream(ScriptedStream),
    Fail(String),
    Hang,
}

/// Transport handing out queued outcomes, one per connect call.
///
/// With an empty queue a connect call fails.
#[derive(Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Connect>>,
    connects: Mutex<Vec<(Peer, Uuid)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next connect succeeds with `stream`.
    pub fn push_stream(&self, stream: ScriptedStream) {
        self.queue.lock().push_back(Connect::Stream(stream));
    }

    /// Next connect fails with `message`.
    pub fn push_failure(&self, message: &str) {
        self.queue.lock().push_back(Connect::Fail(message.to_string()));
    }

    /// Next connect never completes.
    pub fn push_hang(&self) {
        self.queue.lock().push_back(Connect::Hang);
    }

    /// Peers and services connect was called with, in order.
    pub fn connects(&self) -> Vec<(Peer, Uuid)> {
        self.connects.lock().clone()
    }
}

impl Transport for MockTransport {
    fn connect<'a>(&'a self, peer: &'a Peer, service: Uuid) -> BoxFuture<'a, Result<BoxStream>> {
        Box::pin(async move {
            self.connects.lock().push((peer.clone(), service));
            let next = self.queue.lock().pop_front();
            match next {
                Some(Connect::Stream(stream)) => Ok(Box::new(stream) as BoxStream),
                Some(Connect::Fail(message)) => Err(anyhow!("{message}")),
                Some(Connect::Hang) => futures::future::pending().await,
                None => Err(anyhow!("no scripted connection for {}", peer.name)),
            }
        })
    }
}

/// Counts how many times a [`ScriptedStream`] was dropped.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

enum Step {
    Data(Vec<u8>),
    Error(String),
    Eof,
    Hook(Box<dyn FnOnce() + Send>),
}

/// Serial stream replaying a script of reads.
///
/// Once the script is exhausted reads stay pending, like a quiet peer.
pub struct ScriptedStream {
    steps: VecDeque<Step>,
    inner: Option<Box<dyn AsyncRead + Send + Unpin>>,
    connected: bool,
    released: ReleaseCounter,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            inner: None,
            connected: true,
            released: ReleaseCounter::default(),
        }
    }

    /// Delegate reads to another reader once the script is exhausted.
    pub fn wrap(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let mut stream = Self::new();
        stream.inner = Some(Box::new(reader));
        stream
    }

    /// One read returning `bytes`.
    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.steps.push_back(Step::Data(bytes.to_vec()));
        self
    }

    /// One read failing with `message`.
    pub fn error(mut self, message: &str) -> Self {
        self.steps.push_back(Step::Error(message.to_string()));
        self
    }

    /// One read returning end of stream.
    pub fn eof(mut self) -> Self {
        self.steps.push_back(Step::Eof);
        self
    }

    /// Run `hook` when the next read starts.
    pub fn hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.steps.push_back(Step::Hook(Box::new(hook)));
        self
    }

    /// Report not connected after connect.
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Drop counter shared with this stream.
    pub fn released(&self) -> ReleaseCounter {
        self.released.clone()
    }
}

impl Default for ScriptedStream {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Hook(hook)) => hook(),
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.remaining());
                    buf.put_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Step::Data(bytes[n..].to_vec()));
                    }
                    return Poll::Ready(Ok(()));
                }
                Some(Step::Error(message)) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        message,
                    )))
                }
                Some(Step::Eof) => return Poll::Ready(Ok(())),
                None => {
                    return match self.inner.as_mut() {
                        Some(inner) => Pin::new(inner).poll_read(cx, buf),
                        None => Poll::Pending,
                    }
                }
            }
        }
    }
}

impl SerialStream for ScriptedStream {
    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.released.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_scripted_reads() {
        let mut stream = ScriptedStream::new().data(b"abc").error("boom").eof();
        let mut buf = [0u8; 2];

        assert_eq!(stream.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf, b"ab");
        assert_eq!(stream.read(&mut buf).await.unwrap(), 1);
        assert!(stream.read(&mut buf).await.is_err());
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_release_counter() {
        let stream = ScriptedStream::new();
        let released = stream.released();
        assert_eq!(released.get(), 0);
        drop(stream);
        assert_eq!(released.get(), 1);
    }

    #[tokio::test]
    async fn test_transport_queue() {
        let transport = MockTransport::new();
        let peer = Peer::new("ESP32_BT", "24:6F:28:AA:BB:CC");
        transport.push_failure("refused");
        transport.push_stream(ScriptedStream::new());

        assert!(transport.connect(&peer, Uuid::nil()).await.is_err());
        assert!(transport.connect(&peer, Uuid::nil()).await.is_ok());
        assert!(transport.connect(&peer, Uuid::nil()).await.is_err());
        assert_eq!(transport.connects().len(), 3);
    }

    #[tokio::test]
    async fn test_directory_states() {
        let directory = MockDirectory::new(vec![]).disabled();
        assert!(directory.adapter_present().await.unwrap());
        assert!(!directory.adapter_enabled().await.unwrap());

        assert!(MockDirectory::failing("x").bonded_peers().await.is_err());
    }
}
