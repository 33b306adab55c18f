//! Error types for the transport layer.

/// Errors produced by sockets and endpoint parsing.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid endpoint {address:?}: {reason}")]
    InvalidEndpoint {
        address: String,
        reason: &'static str,
    },

    #[error("endpoint is unconfigured")]
    Unconfigured,

    #[error("no async runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("send timed out")]
    Timeout,

    #[error("socket closed")]
    Closed,

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),
}

impl TransportError {
    /// Whether the failure is a bounded wait running out rather than a
    /// broken handle.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}
