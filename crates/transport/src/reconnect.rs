//! Socket tuning and the reconnecting dialer shared by both pumps.

use std::time::Duration;

use rand::Rng;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use teleop_protocol::constants::{DEFAULT_HIGH_WATER_MARK, DEFAULT_LINGER};

use crate::endpoint::Endpoint;

/// Configuration for automatic reconnection with exponential backoff.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry after a failed dial or a dropped link.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculates the delay for a given attempt number (1-based),
    /// with ±25% jitter so sibling sockets do not dial in lockstep.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        let offset: f64 = rand::thread_rng().gen_range(-1.0..1.0);
        let with_jitter = (capped + capped * 0.25 * offset).max(0.01);
        Duration::from_secs_f64(with_jitter)
    }
}

/// Per-socket options.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Queue capacity between the caller and the pump.
    pub high_water_mark: usize,
    /// How long a closing push socket keeps flushing queued frames.
    pub linger: Duration,
    /// Upper bound on a single TCP connect attempt.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            linger: DEFAULT_LINGER,
            connect_timeout: Duration::from_secs(2),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Dials `endpoint` until it connects or `cancel` fires.
///
/// `attempt` carries the backoff position across calls: zero dials
/// immediately, and it is reset to zero on success.
pub(crate) async fn dial(
    endpoint: &Endpoint,
    options: &SocketOptions,
    cancel: &CancellationToken,
    attempt: &mut u32,
) -> Option<TcpStream> {
    loop {
        if *attempt > 0 {
            let delay = options.reconnect.delay_for_attempt(*attempt);
            trace!(%endpoint, attempt = *attempt, delay_ms = delay.as_millis() as u64, "backing off");
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let connect = tokio::time::timeout(
            options.connect_timeout,
            TcpStream::connect((endpoint.host(), endpoint.port())),
        );
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = connect => result,
        };

        match result {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    trace!(%endpoint, error = %e, "set_nodelay failed");
                }
                *attempt = 0;
                return Some(stream);
            }
            Ok(Err(e)) => debug!(%endpoint, attempt = *attempt, error = %e, "dial failed"),
            Err(_) => debug!(%endpoint, attempt = *attempt, "dial timed out"),
        }
        *attempt = attempt.saturating_add(1);
    }
}
