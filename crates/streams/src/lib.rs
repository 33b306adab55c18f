//! Inbound frame streams.
//!
//! Each [`FrameStream`] subscribes to one publishing endpoint and keeps the
//! last few frames in a [`FrameBuffer`]. The receive loop runs as its own
//! task; the tick only ever reads the newest frame.

pub mod buffer;
pub mod stream;

pub use buffer::{FrameBuffer, RingBuffer};
pub use stream::{FrameStream, StreamKind, StreamState};
