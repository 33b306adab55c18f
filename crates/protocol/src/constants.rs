use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address scheme used for every channel and stream.
pub const ADDRESS_SCHEME: &str = "tcp";

/// Canonical "unconfigured" address (empty host and port). Never dialed.
pub const UNCONFIGURED_ADDRESS: &str = "tcp://:";

/// Placeholder host written by the UI before the operator enters an IP.
pub const UNDEFINED_HOST: &str = "undefined";

/// Whether `host` names a server: non-empty and not [`UNDEFINED_HOST`].
pub fn is_configured_host(host: &str) -> bool {
    let host = host.trim();
    !host.is_empty() && host != UNDEFINED_HOST
}

/// Keep-alive marker sent on every open channel.
pub const PING_PAYLOAD: &str = "ping";

/// Prefix of the timestamped diagnostic payload sent after a bulk connect.
pub const DIAGNOSTIC_PREFIX: &str = "DIAGNOSTIC_TEST";

/// Joints per hand sample, wrist to little-finger tip.
pub const HAND_JOINT_COUNT: usize = 26;

/// Decimal digits used when formatting positional samples.
pub const POSITION_PRECISION: usize = 6;

/// Upper bound on how long a single outbound send may suspend the tick.
pub const SEND_TIMEOUT: Duration = Duration::from_millis(10);

/// Consecutive send timeouts tolerated before a channel is rebuilt.
pub const TIMEOUT_FAILURE_THRESHOLD: u32 = 5;

/// Consecutive hard send errors tolerated before a channel is rebuilt.
pub const ERROR_FAILURE_THRESHOLD: u32 = 3;

/// Pending frames a socket queues before sends start to block.
pub const DEFAULT_HIGH_WATER_MARK: usize = 1000;

/// How long a closing push socket keeps flushing queued frames.
pub const DEFAULT_LINGER: Duration = Duration::from_millis(100);

/// Interval between keep-alive cycles.
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(5);

/// Minimum spacing between bulk connection attempts while unhealthy.
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum size of a single length-delimited frame (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Frames retained for the primary camera stream.
pub const CAMERA_BUFFER_CAPACITY: usize = 5;

/// Frames retained for the graph stream.
pub const GRAPH_BUFFER_CAPACITY: usize = 2;

/// Logical names of the outbound channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelName {
    RightHand,
    LeftHand,
    Resolution,
    Pause,
}

impl ChannelName {
    /// Every standard channel, in creation order.
    pub const ALL: [ChannelName; 4] = [
        ChannelName::RightHand,
        ChannelName::LeftHand,
        ChannelName::Resolution,
        ChannelName::Pause,
    ];

    /// Channels that must be open for the link to count as healthy.
    pub const REQUIRED: [ChannelName; 2] = [ChannelName::RightHand, ChannelName::LeftHand];

    /// Registry key for this channel.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelName::RightHand => "RightHand",
            ChannelName::LeftHand => "LeftHand",
            ChannelName::Resolution => "Resolution",
            ChannelName::Pause => "Pause",
        }
    }

    /// Looks up a channel by its registry key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
