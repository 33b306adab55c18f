//! Wire-level vocabulary shared by every teleop transport crate.
//!
//! Outbound channels carry short text frames: positional hand samples
//! (`"relative:x,y,z|x,y,z:"`) and bare auxiliary states (`"High"`). This
//! crate owns the channel names, the text encoding of those frames, and
//! a reference parser used by tests and server-side tooling.

pub mod constants;
pub mod error;
pub mod hand;
pub mod states;

pub use constants::ChannelName;
pub use error::ProtocolError;
pub use hand::{HandFrame, Position, StreamMarker, decode_hand_frame, encode_hand_frame};
pub use states::{PauseState, ResolutionState};
