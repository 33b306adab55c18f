//! Connection-attempt gating.

use std::time::Duration;

use tokio::time::Instant;

use teleop_channels::AddressSet;
use teleop_protocol::constants::CONNECT_RETRY_INTERVAL;

/// The most recent connect against the server.
#[derive(Debug, Clone)]
pub struct ConnectionAttempt {
    pub addresses: AddressSet,
    pub at: Instant,
    pub healthy: bool,
}

/// Limits how often an unhealthy controller retries.
#[derive(Debug)]
pub struct AttemptGate {
    retry_interval: Duration,
    last: Option<ConnectionAttempt>,
}

impl Default for AttemptGate {
    fn default() -> Self {
        Self::new(CONNECT_RETRY_INTERVAL)
    }
}

impl AttemptGate {
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            retry_interval,
            last: None,
        }
    }

    pub fn last(&self) -> Option<&ConnectionAttempt> {
        self.last.as_ref()
    }

    /// No attempt yet, a different address set, or the retry interval has
    /// elapsed since the last attempt.
    pub fn allows(&self, addresses: &AddressSet) -> bool {
        match &self.last {
            None => true,
            Some(last) => {
                last.addresses != *addresses || last.at.elapsed() >= self.retry_interval
            }
        }
    }

    /// Whether `addresses` differs from the last attempt's set.
    pub fn address_changed(&self, addresses: &AddressSet) -> bool {
        self.last
            .as_ref()
            .is_some_and(|last| last.addresses != *addresses)
    }

    pub fn record(&mut self, addresses: AddressSet, healthy: bool) {
        self.last = Some(ConnectionAttempt {
            addresses,
            at: Instant::now(),
            healthy,
        });
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(port: u16) -> AddressSet {
        AddressSet {
            host: "10.0.0.9".into(),
            right_hand: format!("tcp://10.0.0.9:{port}"),
            ..AddressSet::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_interval() {
        let mut gate = AttemptGate::default();
        assert!(gate.allows(&set(1)));

        gate.record(set(1), false);
        assert!(!gate.allows(&set(1)));

        tokio::time::advance(Duration::from_millis(1_999)).await;
        assert!(!gate.allows(&set(1)));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(gate.allows(&set(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn changed_addresses_bypass_interval() {
        let mut gate = AttemptGate::default();
        gate.record(set(1), true);

        assert!(!gate.address_changed(&set(1)));
        assert!(gate.address_changed(&set(2)));
        assert!(gate.allows(&set(2)));
        assert!(gate.last().unwrap().healthy);

        gate.reset();
        assert!(!gate.address_changed(&set(2)));
        assert!(gate.last().is_none());
    }
}
