//! Outbound push socket.

use std::time::Duration;

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use teleop_protocol::constants::MAX_FRAME_SIZE;

use crate::codec::frame_codec;
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::reconnect::{SocketOptions, dial};

/// Fire-and-forget sender bound to one endpoint.
///
/// Frames are queued for a background pump that owns the TCP stream. The
/// pump dials on creation and redials whenever the link drops, so a peer
/// that starts late is picked up without intervention.
#[derive(Debug)]
pub struct PushSocket {
    endpoint: Endpoint,
    queue: mpsc::Sender<Bytes>,
    link: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl PushSocket {
    /// Creates the socket and spawns its pump on the current runtime.
    ///
    /// Returns immediately; the link comes up in the background.
    pub fn connect(endpoint: Endpoint, options: &SocketOptions) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()?;

        let (queue_tx, queue_rx) = mpsc::channel(options.high_water_mark.max(1));
        let (link_tx, link_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        runtime.spawn(push_pump(
            endpoint.clone(),
            queue_rx,
            link_tx,
            options.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            endpoint,
            queue: queue_tx,
            link: link_rx,
            cancel,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether the pump currently holds a live connection.
    pub fn is_linked(&self) -> bool {
        *self.link.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.queue.is_closed()
    }

    /// Queues one frame, waiting at most `timeout` for the link to be up and
    /// the queue to have room.
    pub async fn send(&self, frame: impl Into<Bytes>, timeout: Duration) -> Result<(), TransportError> {
        let frame = frame.into();
        if frame.len() > MAX_FRAME_SIZE {
            return Err(TransportError::FrameTooLarge(frame.len()));
        }
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut link = self.link.clone();
        let enqueue = async {
            link.wait_for(|up| *up)
                .await
                .map(|_| ())
                .map_err(|_| TransportError::Closed)?;
            self.queue
                .send(frame)
                .await
                .map_err(|_| TransportError::Closed)
        };

        match tokio::time::timeout(timeout, enqueue).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Stops the pump. Frames already queued get a bounded linger to flush.
    ///
    /// Idempotent and non-blocking.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(endpoint = %self.endpoint, "closing push socket");
            self.cancel.cancel();
        }
    }
}

impl Drop for PushSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn push_pump(
    endpoint: Endpoint,
    mut queue: mpsc::Receiver<Bytes>,
    link: watch::Sender<bool>,
    options: SocketOptions,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;

    'session: loop {
        let Some(stream) = dial(&endpoint, &options, &cancel, &mut attempt).await else {
            break;
        };
        let (read_half, write_half) = stream.into_split();
        let mut sink = FramedWrite::new(write_half, frame_codec());
        let peer_gone = peer_closed(read_half);
        tokio::pin!(peer_gone);

        link.send_replace(true);
        debug!(%endpoint, "push link up");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    linger(&endpoint, &mut sink, &mut queue, options.linger).await;
                    break 'session;
                }
                () = &mut peer_gone => {
                    debug!(%endpoint, "peer closed push link");
                    break;
                }
                frame = queue.recv() => match frame {
                    // A peer that stops reading stalls the write; close must
                    // still be observed. Bytes already handed to the codec
                    // stay buffered for the linger flush.
                    Some(frame) => tokio::select! {
                        biased;
                        written = SinkExt::<Bytes>::send(&mut sink, frame) => {
                            if let Err(e) = written {
                                warn!(%endpoint, error = %e, "push write failed");
                                break;
                            }
                        }
                        _ = cancel.cancelled() => {
                            linger(&endpoint, &mut sink, &mut queue, options.linger).await;
                            break 'session;
                        }
                    },
                    None => break 'session,
                },
            }
        }

        link.send_replace(false);
        // Back off before redialing so a flapping peer cannot spin the pump.
        attempt = 1;
    }

    link.send_replace(false);
    trace!(%endpoint, "push pump stopped");
}

/// Resolves once the peer half-closes or resets the connection.
async fn peer_closed(mut read_half: OwnedReadHalf) {
    let mut scratch = [0u8; 64];
    loop {
        match read_half.read(&mut scratch).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

async fn linger(
    endpoint: &Endpoint,
    sink: &mut FramedWrite<tokio::net::tcp::OwnedWriteHalf, LengthDelimitedCodec>,
    queue: &mut mpsc::Receiver<Bytes>,
    window: Duration,
) {
    let flush = async {
        while let Ok(frame) = queue.try_recv() {
            SinkExt::<Bytes>::feed(&mut *sink, frame).await?;
        }
        SinkExt::<Bytes>::flush(&mut *sink).await?;
        Ok::<(), std::io::Error>(())
    };
    match tokio::time::timeout(window, flush).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => trace!(%endpoint, error = %e, "linger flush failed"),
        Err(_) => trace!(%endpoint, "linger window elapsed with frames pending"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::net::TcpListener;
    use tokio_util::codec::FramedRead;

    async fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::parse(&format!("tcp://127.0.0.1:{port}")).unwrap();
        (listener, endpoint)
    }

    fn unreachable_endpoint() -> Endpoint {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Endpoint::parse(&format!("tcp://127.0.0.1:{port}")).unwrap()
    }

    #[test]
    fn connect_without_runtime_fails() {
        let result = PushSocket::connect(unreachable_endpoint(), &SocketOptions::default());
        assert!(matches!(result, Err(TransportError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn delivers_frames_in_order() {
        let (listener, endpoint) = listener().await;
        let socket = PushSocket::connect(endpoint, &SocketOptions::default()).unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let mut frames = FramedRead::new(stream, frame_codec());

        for payload in ["relative:", "High", "ping"] {
            socket
                .send(payload, Duration::from_secs(2))
                .await
                .unwrap();
        }

        for expected in ["relative:", "High", "ping"] {
            let frame = frames.next().await.unwrap().unwrap();
            assert_eq!(&frame[..], expected.as_bytes());
        }
    }

    #[tokio::test]
    async fn send_to_unreachable_peer_times_out() {
        let socket = PushSocket::connect(unreachable_endpoint(), &SocketOptions::default()).unwrap();

        let start = tokio::time::Instant::now();
        let err = socket
            .send("ping", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(!socket.is_linked());
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let socket = PushSocket::connect(unreachable_endpoint(), &SocketOptions::default()).unwrap();
        socket.close();
        socket.close();
        assert!(socket.is_closed());
        let err = socket.send("ping", Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let socket = PushSocket::connect(unreachable_endpoint(), &SocketOptions::default()).unwrap();
        let frame = vec![0u8; MAX_FRAME_SIZE + 1];
        let err = socket.send(frame, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge(n) if n == MAX_FRAME_SIZE + 1));
    }

    #[tokio::test]
    async fn redials_after_peer_drops() {
        let (listener, endpoint) = listener().await;
        let socket = PushSocket::connect(endpoint, &SocketOptions::default()).unwrap();

        let (first, _) = listener.accept().await.unwrap();
        drop(first);

        let (second, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("pump should redial")
            .unwrap();
        let mut frames = FramedRead::new(second, frame_codec());

        socket.send("Low", Duration::from_secs(2)).await.unwrap();
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"Low");
    }

    #[tokio::test]
    async fn close_flushes_queued_frames() {
        let (listener, endpoint) = listener().await;
        let socket = PushSocket::connect(endpoint, &SocketOptions::default()).unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        socket.send("Pause", Duration::from_secs(2)).await.unwrap();
        socket.close();

        let mut frames = FramedRead::new(stream, frame_codec());
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"Pause");
    }

    /// Fills the peer's receive window and the queue behind it.
    async fn saturate(socket: &PushSocket, timeout: Duration) -> TransportError {
        let chunk = Bytes::from(vec![0u8; 4 * 1024 * 1024]);
        for _ in 0..40 {
            let start = tokio::time::Instant::now();
            let result = socket.send(chunk.clone(), timeout).await;
            assert!(start.elapsed() < timeout + Duration::from_millis(300));
            if let Err(e) = result {
                return e;
            }
        }
        panic!("a stalled peer never pushed back");
    }

    #[tokio::test]
    async fn send_times_out_when_peer_stops_reading() {
        let (listener, endpoint) = listener().await;
        let options = SocketOptions {
            high_water_mark: 2,
            ..SocketOptions::default()
        };
        let socket = PushSocket::connect(endpoint, &options).unwrap();
        let (_stalled, _) = listener.accept().await.unwrap();

        let err = saturate(&socket, Duration::from_millis(200)).await;
        assert!(err.is_timeout());
        assert!(socket.is_linked());
    }

    #[tokio::test]
    async fn close_ends_pump_blocked_on_stalled_peer() {
        let (listener, endpoint) = listener().await;
        let options = SocketOptions {
            high_water_mark: 2,
            ..SocketOptions::default()
        };
        let socket = PushSocket::connect(endpoint, &options).unwrap();
        let (_stalled, _) = listener.accept().await.unwrap();

        saturate(&socket, Duration::from_millis(200)).await;
        socket.close();

        // The pump owns the queue receiver; it is dropped when the pump exits.
        tokio::time::timeout(Duration::from_secs(2), async {
            while !socket.queue.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("pump should exit after close");
    }
}
