//! Framed TCP sockets for the teleop link.
//!
//! Two socket flavours, both backed by a background pump task that owns the
//! TCP stream and reconnects with backoff on its own:
//!
//! - [`PushSocket`]: outbound. `send` enqueues a frame, waiting at most a
//!   caller-supplied timeout for the link to be up and the queue to have room.
//! - [`SubSocket`]: inbound. `recv` awaits the next frame; frames arriving
//!   while the receive queue is at its high-water mark are dropped.
//!
//! Closing either socket cancels its pump. Close is idempotent and never
//! waits for the pump to finish.
//!
//! # Wire format
//!
//! ```text
//! [4 bytes BE: payload_len][payload_len bytes: payload]
//! ```

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod push;
pub mod reconnect;
pub mod sub;

pub use endpoint::{Endpoint, is_unconfigured};
pub use error::TransportError;
pub use push::PushSocket;
pub use reconnect::{ReconnectConfig, SocketOptions};
pub use sub::{SubCloser, SubSocket};
