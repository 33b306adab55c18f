//! Inbound subscribe socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::codec::frame_codec;
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::reconnect::{SocketOptions, dial};

/// Receiver bound to one publishing endpoint.
///
/// A background pump dials the publisher, redials on loss, and forwards
/// frames into a bounded queue. When the queue is full new frames are
/// dropped and counted; the publisher is never slowed down.
#[derive(Debug)]
pub struct SubSocket {
    endpoint: Endpoint,
    frames: mpsc::Receiver<Bytes>,
    link: watch::Receiver<bool>,
    dropped: Arc<AtomicU64>,
    cancel: CancellationToken,
}

/// Cloneable handle that closes a [`SubSocket`] from another task.
#[derive(Debug, Clone)]
pub struct SubCloser(CancellationToken);

impl SubCloser {
    pub fn close(&self) {
        self.0.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_cancelled()
    }
}

impl SubSocket {
    /// Creates the socket and spawns its pump on the current runtime.
    pub fn connect(endpoint: Endpoint, options: &SocketOptions) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()?;

        let (frames_tx, frames_rx) = mpsc::channel(options.high_water_mark.max(1));
        let (link_tx, link_rx) = watch::channel(false);
        let dropped = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        runtime.spawn(sub_pump(
            endpoint.clone(),
            frames_tx,
            link_tx,
            Arc::clone(&dropped),
            options.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            endpoint,
            frames: frames_rx,
            link: link_rx,
            dropped,
            cancel,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_linked(&self) -> bool {
        *self.link.borrow()
    }

    /// Frames discarded because the receive queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn closer(&self) -> SubCloser {
        SubCloser(self.cancel.clone())
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Awaits the next frame. Returns `None` once the socket is closed.
    ///
    /// Frames still queued at close time are discarded.
    pub async fn recv(&mut self) -> Option<Bytes> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            frame = self.frames.recv() => frame,
        }
    }
}

impl Drop for SubSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn sub_pump(
    endpoint: Endpoint,
    frames: mpsc::Sender<Bytes>,
    link: watch::Sender<bool>,
    dropped: Arc<AtomicU64>,
    options: SocketOptions,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;

    'session: loop {
        let Some(stream) = dial(&endpoint, &options, &cancel, &mut attempt).await else {
            break;
        };
        let mut source = FramedRead::new(stream, frame_codec());
        link.send_replace(true);
        debug!(%endpoint, "subscribe link up");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'session,
                next = source.next() => match next {
                    Some(Ok(frame)) => match frames.try_send(frame.freeze()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                            trace!(%endpoint, total, "receive queue full, frame dropped");
                        }
                        Err(TrySendError::Closed(_)) => break 'session,
                    },
                    Some(Err(e)) => {
                        warn!(%endpoint, error = %e, "subscribe read failed");
                        break;
                    }
                    None => {
                        debug!(%endpoint, "publisher closed subscribe link");
                        break;
                    }
                },
            }
        }

        link.send_replace(false);
        attempt = 1;
    }

    link.send_replace(false);
    trace!(%endpoint, "subscribe pump stopped");
}
