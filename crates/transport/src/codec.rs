//! Length-delimited framing shared by both socket flavours.

use tokio_util::codec::LengthDelimitedCodec;

use teleop_protocol::constants::MAX_FRAME_SIZE;

/// Builds the codec: 4-byte big-endian length prefix, capped at
/// [`MAX_FRAME_SIZE`].
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(MAX_FRAME_SIZE)
        .new_codec()
}
