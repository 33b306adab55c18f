//! One inbound subscription and its receive loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use teleop_protocol::constants::{CAMERA_BUFFER_CAPACITY, GRAPH_BUFFER_CAPACITY};
use teleop_transport::{Endpoint, SocketOptions, SubCloser, SubSocket, is_unconfigured};

use crate::buffer::FrameBuffer;

/// The inbound streams the bridge subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Camera,
    Graph,
}

impl StreamKind {
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Camera => "camera",
            StreamKind::Graph => "graph",
        }
    }

    /// Frames kept for this stream.
    pub fn capacity(self) -> usize {
        match self {
            StreamKind::Camera => CAMERA_BUFFER_CAPACITY,
            StreamKind::Graph => GRAPH_BUFFER_CAPACITY,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Disconnected,
    Connecting,
    Receiving,
}

/// State tagged with the session that wrote it, so a loop that is winding
/// down cannot overwrite the state of its successor.
#[derive(Debug, Default)]
struct StateCell {
    inner: Mutex<(u64, StreamState)>,
}

impl StateCell {
    fn get(&self) -> StreamState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).1
    }

    /// Starts a new session and returns its id.
    fn begin(&self, state: StreamState) -> u64 {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.0 += 1;
        guard.1 = state;
        guard.0
    }

    fn set(&self, session: u64, state: StreamState) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.0 == session {
            guard.1 = state;
        }
    }
}

/// Subscription to one publisher with a bounded latest-frame buffer.
///
/// The receive loop is spawned on [`start`](Self::start) and ends when the
/// socket is closed, the stream is disabled, or the socket reports an
/// error. It never retries in place; [`sync`](Self::sync) restarts it.
pub struct FrameStream {
    kind: StreamKind,
    options: SocketOptions,
    buffer: FrameBuffer,
    state: Arc<StateCell>,
    enabled: Arc<AtomicBool>,
    address: Option<String>,
    rejected: Option<String>,
    closer: Option<SubCloser>,
    task: Option<JoinHandle<()>>,
}

impl FrameStream {
    pub fn new(kind: StreamKind, options: SocketOptions) -> Self {
        Self {
            kind,
            options,
            buffer: FrameBuffer::new(kind.capacity()),
            state: Arc::new(StateCell::default()),
            enabled: Arc::new(AtomicBool::new(true)),
            address: None,
            rejected: None,
            closer: None,
            task: None,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    /// Address of the current or most recent session.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Shared handle to the frame buffer.
    pub fn buffer(&self) -> FrameBuffer {
        self.buffer.clone()
    }

    /// Whether a receive loop is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Disabling makes the receive loop exit on its next wake.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Newest frame, without blocking.
    pub fn latest(&self) -> Option<Bytes> {
        self.buffer.latest()
    }

    /// Subscribes to `address` and spawns the receive loop.
    ///
    /// Returns `false` and stays disconnected for the placeholder address or
    /// an address that does not parse.
    pub fn start(&mut self, address: &str) -> bool {
        let address = address.trim();
        if is_unconfigured(address) {
            debug!(stream = %self.kind, "no address configured");
            return false;
        }
        if self.is_running() && self.address.as_deref() == Some(address) {
            return true;
        }
        self.stop();

        let endpoint = match Endpoint::parse(address) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                if self.rejected.as_deref() != Some(address) {
                    warn!(stream = %self.kind, address, error = %e, "rejecting stream address");
                    self.rejected = Some(address.to_string());
                }
                return false;
            }
        };
        self.rejected = None;

        let session = self.state.begin(StreamState::Connecting);
        let socket = match SubSocket::connect(endpoint, &self.options) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(stream = %self.kind, address, error = %e, "failed to open subscribe socket");
                self.state.set(session, StreamState::Disconnected);
                return false;
            }
        };

        info!(stream = %self.kind, address, "stream started");
        self.closer = Some(socket.closer());
        self.address = Some(address.to_string());
        self.task = Some(tokio::spawn(receive_loop(
            self.kind,
            socket,
            self.buffer.clone(),
            Arc::clone(&self.enabled),
            Arc::clone(&self.state),
            session,
        )));
        true
    }

    /// Closes the subscription; the loop sees the close on its pending
    /// receive and ends by itself. Idempotent.
    pub fn stop(&mut self) {
        let Some(closer) = self.closer.take() else {
            return;
        };
        closer.close();
        self.task = None;
        self.state.begin(StreamState::Disconnected);
        info!(stream = %self.kind, "stream stopped");
    }

    /// Restarts against the last address.
    pub fn reconnect(&mut self) -> bool {
        match self.address.clone() {
            Some(address) => {
                self.stop();
                self.start(&address)
            }
            None => false,
        }
    }

    /// Per-tick reconciliation with the configured address.
    ///
    /// A forced disconnect stops the stream and keeps it stopped. A changed
    /// address restarts against the new one. A stream that is not running
    /// is started when an address is available and the stream is enabled.
    pub fn sync(&mut self, configured: &str, force_disconnect: bool) {
        let configured = configured.trim();

        if force_disconnect {
            if self.closer.is_some() {
                info!(stream = %self.kind, "forced disconnect");
                self.stop();
            }
            return;
        }

        if self.is_running() {
            if self.address.as_deref() != Some(configured) {
                info!(stream = %self.kind, from = ?self.address, to = configured, "stream address changed");
                self.stop();
                if self.is_enabled() {
                    self.start(configured);
                }
            }
            return;
        }

        if !is_unconfigured(configured) && self.is_enabled() {
            self.start(configured);
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer.close();
        }
    }
}

async fn receive_loop(
    kind: StreamKind,
    mut socket: SubSocket,
    buffer: FrameBuffer,
    enabled: Arc<AtomicBool>,
    state: Arc<StateCell>,
    session: u64,
) {
    state.set(session, StreamState::Receiving);
    debug!(stream = %kind, endpoint = %socket.endpoint(), "receive loop running");

    while let Some(frame) = socket.recv().await {
        if !enabled.load(Ordering::Relaxed) {
            debug!(stream = %kind, "stream disabled");
            break;
        }
        buffer.push(frame);
    }

    socket.close();
    state.set(session, StreamState::Disconnected);
    debug!(stream = %kind, dropped = socket.dropped(), "receive loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::SinkExt;
    use teleop_transport::codec::frame_codec;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};

    async fn publisher() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, format!("tcp://127.0.0.1:{port}"))
    }

    async fn accept(listener: &TcpListener) -> FramedWrite<TcpStream, LengthDelimitedCodec> {
        let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("subscriber should dial")
            .unwrap();
        FramedWrite::new(stream, frame_codec())
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(tokio::time::Instant::now() < deadline, "condition not reached");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn kinds_carry_capacity() {
        assert_eq!(StreamKind::Camera.capacity(), 5);
        assert_eq!(StreamKind::Graph.capacity(), 2);
        assert_eq!(StreamKind::Graph.to_string(), "graph");
    }

    #[tokio::test]
    async fn placeholder_address_never_starts() {
        let mut stream = FrameStream::new(StreamKind::Camera, SocketOptions::default());
        assert!(!stream.start("tcp://:"));
        assert!(!stream.start("udp://1.2.3.4:5"));
        stream.sync("tcp://:", false);
        assert_eq!(stream.state(), StreamState::Disconnected);
        assert!(!stream.is_running());
    }

    #[tokio::test]
    async fn keeps_only_newest_frames() {
        let (listener, address) = publisher().await;
        let mut stream = FrameStream::new(StreamKind::Camera, SocketOptions::default());
        assert!(stream.start(&address));

        let mut out = accept(&listener).await;
        for i in 0..7u8 {
            out.send(Bytes::from(vec![i])).await.unwrap();
        }

        wait_until(|| stream.latest().as_deref() == Some(&[6u8][..])).await;
        assert_eq!(stream.state(), StreamState::Receiving);
        assert!(stream.buffer().len() <= 5);
    }

    #[tokio::test]
    async fn stop_ends_receive_loop() {
        let (listener, address) = publisher().await;
        let mut stream = FrameStream::new(StreamKind::Graph, SocketOptions::default());
        assert!(stream.start(&address));
        let _out = accept(&listener).await;

        let buffer = stream.buffer();
        stream.stop();
        stream.stop();
        assert_eq!(stream.state(), StreamState::Disconnected);
        assert!(!stream.is_running());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn sync_follows_address_changes() {
        let (first, first_address) = publisher().await;
        let (second, second_address) = publisher().await;
        let mut stream = FrameStream::new(StreamKind::Camera, SocketOptions::default());

        stream.sync(&first_address, false);
        assert!(stream.is_running());
        let _a = accept(&first).await;

        stream.sync(&first_address, false);
        assert_eq!(stream.address(), Some(first_address.as_str()));

        stream.sync(&second_address, false);
        assert_eq!(stream.address(), Some(second_address.as_str()));
        let mut out = accept(&second).await;
        out.send(Bytes::from_static(b"graph")).await.unwrap();
        wait_until(|| stream.latest().is_some()).await;
    }

    #[tokio::test]
    async fn forced_disconnect_stays_stopped() {
        let (listener, address) = publisher().await;
        let mut stream = FrameStream::new(StreamKind::Camera, SocketOptions::default());
        stream.sync(&address, false);
        let _out = accept(&listener).await;

        stream.sync(&address, true);
        assert!(!stream.is_running());
        stream.sync(&address, true);
        assert!(!stream.is_running());
        assert_eq!(stream.state(), StreamState::Disconnected);

        stream.sync(&address, false);
        assert!(stream.is_running());
    }

    #[tokio::test]
    async fn disabling_exits_on_next_frame() {
        let (listener, address) = publisher().await;
        let mut stream = FrameStream::new(StreamKind::Graph, SocketOptions::default());
        assert!(stream.start(&address));
        let mut out = accept(&listener).await;

        out.send(Bytes::from_static(b"first")).await.unwrap();
        wait_until(|| stream.latest().is_some()).await;

        stream.set_enabled(false);
        out.send(Bytes::from_static(b"second")).await.unwrap();
        wait_until(|| !stream.is_running()).await;
        assert_eq!(stream.latest(), Some(Bytes::from_static(b"first")));
        assert_eq!(stream.state(), StreamState::Disconnected);

        stream.sync(&address, false);
        assert!(!stream.is_running());
    }

    #[tokio::test]
    async fn reconnect_restarts_last_address() {
        let (listener, address) = publisher().await;
        let mut stream = FrameStream::new(StreamKind::Camera, SocketOptions::default());
        assert!(!stream.reconnect());

        assert!(stream.start(&address));
        let _first = accept(&listener).await;
        assert!(stream.reconnect());
        let _second = accept(&listener).await;
        assert!(stream.is_running());
    }
}
