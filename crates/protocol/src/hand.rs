//! Positional sample encoding.
//!
//! ```text
//! <marker>:<x>,<y>,<z>|<x>,<y>,<z>|...:
//! ```
//!
//! Every component is fixed-point with [`POSITION_PRECISION`] decimals so
//! the server-side parser sees a stable format. An empty sample encodes as
//! `"<marker>:"`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::POSITION_PRECISION;
use crate::error::ProtocolError;

/// A single joint position in world space (metres).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Position {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// How the receiver should interpret a positional payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMarker {
    /// Joint positions relative to the operator's reference pose.
    Relative,
    /// Joint positions with the wrist tracked in absolute space.
    Absolute,
}

impl StreamMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamMarker::Relative => "relative",
            StreamMarker::Absolute => "absolute",
        }
    }
}

impl fmt::Display for StreamMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StreamMarker {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relative" => Ok(StreamMarker::Relative),
            "absolute" => Ok(StreamMarker::Absolute),
            other => Err(ProtocolError::UnknownMarker(other.to_string())),
        }
    }
}

/// A decoded positional frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    pub marker: StreamMarker,
    pub positions: Vec<Position>,
}

/// Encodes the tuple section: `x,y,z|x,y,z:` (empty string for no samples).
pub fn encode_positions(positions: &[Position]) -> String {
    // "-0.000000," is 10 bytes; three per tuple plus separators.
    let mut out = String::with_capacity(positions.len() * 36);
    for (i, p) in positions.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        out.push_str(&format!(
            "{:.prec$},{:.prec$},{:.prec$}",
            p.x,
            p.y,
            p.z,
            prec = POSITION_PRECISION
        ));
    }
    if !positions.is_empty() {
        out.push(':');
    }
    out
}

/// Encodes a full positional frame: `<marker>:<tuples>:`.
pub fn encode_hand_frame(marker: StreamMarker, positions: &[Position]) -> String {
    let tuples = encode_positions(positions);
    let mut out = String::with_capacity(marker.as_str().len() + 1 + tuples.len());
    out.push_str(marker.as_str());
    out.push(':');
    out.push_str(&tuples);
    out
}

/// Reference parser for [`encode_hand_frame`] output.
pub fn decode_hand_frame(frame: &str) -> Result<HandFrame, ProtocolError> {
    let (marker, rest) = frame.split_once(':').ok_or(ProtocolError::MissingMarker)?;
    let marker: StreamMarker = marker.parse()?;

    if rest.is_empty() {
        return Ok(HandFrame {
            marker,
            positions: Vec::new(),
        });
    }

    let body = rest.strip_suffix(':').ok_or(ProtocolError::Unterminated)?;
    let positions = body
        .split('|')
        .enumerate()
        .map(|(index, tuple)| parse_tuple(index, tuple))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HandFrame { marker, positions })
}

fn parse_tuple(index: usize, tuple: &str) -> Result<Position, ProtocolError> {
    let parts: Vec<&str> = tuple.split(',').collect();
    if parts.len() != 3 {
        return Err(ProtocolError::TupleArity {
            index,
            found: parts.len(),
        });
    }
    let mut xyz = [0f32; 3];
    for (slot, raw) in xyz.iter_mut().zip(&parts) {
        *slot = raw.parse().map_err(|_| ProtocolError::InvalidNumber {
            index,
            value: (*raw).to_string(),
        })?;
    }
    Ok(Position::from(xyz))
}
