//! Public types for the channel registry.

use std::time::Duration;

use teleop_protocol::ChannelName;
use teleop_protocol::constants::{
    ERROR_FAILURE_THRESHOLD, SEND_TIMEOUT, TIMEOUT_FAILURE_THRESHOLD, is_configured_host,
};
use teleop_transport::SocketOptions;

/// Server host plus the address of every standard outbound channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    pub host: String,
    pub right_hand: String,
    pub left_hand: String,
    pub resolution: String,
    pub pause: String,
}

impl AddressSet {
    /// Whether the host is usable (non-empty and not `"undefined"`).
    pub fn has_host(&self) -> bool {
        is_configured_host(&self.host)
    }

    pub fn address(&self, name: ChannelName) -> &str {
        match name {
            ChannelName::RightHand => &self.right_hand,
            ChannelName::LeftHand => &self.left_hand,
            ChannelName::Resolution => &self.resolution,
            ChannelName::Pause => &self.pause,
        }
    }

    /// Channels paired with their addresses, in [`ChannelName::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ChannelName, &str)> + '_ {
        ChannelName::ALL.into_iter().map(|name| (name, self.address(name)))
    }
}

/// Tuning for [`ChannelRegistry`](crate::ChannelRegistry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound on one send attempt.
    pub send_timeout: Duration,
    /// Consecutive timeouts tolerated before the channel is rebuilt.
    pub timeout_threshold: u32,
    /// Consecutive hard errors tolerated before the channel is rebuilt.
    pub error_threshold: u32,
    /// Minimum spacing between per-send debug lines.
    pub send_log_interval: Duration,
    pub socket: SocketOptions,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            send_timeout: SEND_TIMEOUT,
            timeout_threshold: TIMEOUT_FAILURE_THRESHOLD,
            error_threshold: ERROR_FAILURE_THRESHOLD,
            send_log_interval: Duration::from_secs(1),
            socket: SocketOptions::default(),
        }
    }
}

/// How a send failed, which decides the reconnect threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The bounded wait ran out.
    Timeout,
    /// The handle is closed or rejected the frame.
    Hard,
}

impl FailureKind {
    pub fn threshold(self, config: &RegistryConfig) -> u32 {
        match self {
            FailureKind::Timeout => config.timeout_threshold,
            FailureKind::Hard => config.error_threshold,
        }
    }
}

/// Snapshot of one channel, for logging and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub name: String,
    pub address: String,
    pub connected: bool,
    pub has_handle: bool,
    pub failures: u32,
    pub reconnects: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AddressSet {
        AddressSet {
            host: "10.0.0.5".into(),
            right_hand: "tcp://10.0.0.5:8087".into(),
            left_hand: "tcp://10.0.0.5:8110".into(),
            resolution: "tcp://10.0.0.5:8093".into(),
            pause: "tcp://10.0.0.5:8100".into(),
        }
    }

    #[test]
    fn iter_follows_channel_order() {
        let set = sample();
        let pairs: Vec<_> = set.iter().map(|(n, a)| (n.as_str(), a.to_string())).collect();
        assert_eq!(pairs[0], ("RightHand", "tcp://10.0.0.5:8087".to_string()));
        assert_eq!(pairs[3], ("Pause", "tcp://10.0.0.5:8100".to_string()));
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn undefined_host_is_not_usable() {
        let mut set = sample();
        assert!(set.has_host());
        set.host = "undefined".into();
        assert!(!set.has_host());
        set.host = "  ".into();
        assert!(!set.has_host());
    }

    #[test]
    fn thresholds_follow_failure_kind() {
        let config = RegistryConfig::default();
        assert_eq!(FailureKind::Timeout.threshold(&config), 5);
        assert_eq!(FailureKind::Hard.threshold(&config), 3);
        assert_eq!(config.send_timeout, Duration::from_millis(10));
    }
}
