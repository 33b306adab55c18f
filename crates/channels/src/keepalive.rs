//! Periodic `ping` on every channel while the registry is healthy.

use std::time::Duration;

use tracing::{debug, trace};

use teleop_protocol::constants::{KEEPALIVE_PERIOD, PING_PAYLOAD};

use crate::registry::ChannelRegistry;

/// Keep-alive cycle, scheduled by the host independently of the tick rate.
#[derive(Debug)]
pub struct KeepAlive {
    period: Duration,
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self::new(KEEPALIVE_PERIOD)
    }
}

impl KeepAlive {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sends `ping` on every channel through the regular send path.
    ///
    /// Does nothing while the registry is unhealthy. Returns the number of
    /// pings delivered.
    pub async fn run_cycle(&self, registry: &mut ChannelRegistry) -> usize {
        if !registry.is_healthy() {
            trace!("registry unhealthy, skipping keep-alive");
            return 0;
        }

        let mut delivered = 0;
        for name in registry.channel_names() {
            if registry.send(&name, PING_PAYLOAD).await {
                delivered += 1;
            }
        }
        debug!(delivered, "keep-alive cycle");
        delivered
    }
}
