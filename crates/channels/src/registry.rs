//! Name-indexed registry of outbound push channels.

use std::collections::HashMap;
use std::fmt::Display;

use bytes::Bytes;
use chrono::{DateTime, Local, TimeZone};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use teleop_protocol::ChannelName;
use teleop_protocol::constants::{DIAGNOSTIC_PREFIX, is_configured_host};
use teleop_transport::{Endpoint, PushSocket, SocketOptions, TransportError, is_unconfigured};

use crate::types::{AddressSet, ChannelStatus, FailureKind, RegistryConfig};

struct Channel {
    endpoint: Endpoint,
    handle: Option<PushSocket>,
    connected: bool,
    failures: u32,
    reconnects: u32,
}

impl Channel {
    fn status(&self, name: &str) -> ChannelStatus {
        ChannelStatus {
            name: name.to_string(),
            address: self.endpoint.to_string(),
            connected: self.connected,
            has_handle: self.handle.is_some(),
            failures: self.failures,
            reconnects: self.reconnects,
        }
    }
}

/// Owns every outbound channel handle.
///
/// All operations are driven from one task through `&mut self`. Send never
/// blocks longer than [`RegistryConfig::send_timeout`]; failures are counted
/// per channel and a channel whose counter crosses its threshold is rebuilt
/// against its last-known address. Callers only ever observe `bool`.
pub struct ChannelRegistry {
    config: RegistryConfig,
    host: String,
    channels: HashMap<String, Channel>,
    last_send_log: Option<Instant>,
}

impl ChannelRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            host: String::new(),
            channels: HashMap::new(),
            last_send_log: None,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Server host recorded by the last [`connect`](Self::connect).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Opens a push channel. Idempotent while `name` holds a live handle.
    ///
    /// Empty, placeholder, or malformed addresses allocate nothing and
    /// return `false`.
    pub fn create(&mut self, name: &str, address: &str) -> bool {
        if let Some(existing) = self.channels.get(name)
            && existing.handle.is_some()
        {
            debug!(channel = name, "channel already exists");
            return true;
        }

        let endpoint = match Endpoint::parse(address) {
            Ok(endpoint) => endpoint,
            Err(TransportError::Unconfigured) => {
                debug!(channel = name, address, "skipping unconfigured channel");
                return false;
            }
            Err(e) => {
                warn!(channel = name, address, error = %e, "rejecting channel address");
                return false;
            }
        };

        let handle = open_socket(name, &endpoint, &self.config.socket);
        let connected = handle.is_some();
        if connected {
            info!(channel = name, address = %endpoint, "channel created");
        }
        self.channels.insert(
            name.to_string(),
            Channel {
                endpoint,
                handle,
                connected,
                failures: 0,
                reconnects: 0,
            },
        );
        connected
    }

    /// One bounded send attempt on `name`.
    pub async fn send(&mut self, name: &str, payload: impl Into<Bytes>) -> bool {
        let Some(channel) = self.channels.get_mut(name) else {
            trace!(channel = name, "send on unknown channel");
            return false;
        };
        let Some(handle) = channel.handle.as_ref() else {
            return false;
        };

        let kind = match handle.send(payload, self.config.send_timeout).await {
            Ok(()) => {
                channel.failures = 0;
                channel.connected = true;
                self.log_send(name);
                return true;
            }
            Err(e) => {
                trace!(channel = name, error = %e, "send failed");
                if e.is_timeout() {
                    FailureKind::Timeout
                } else {
                    FailureKind::Hard
                }
            }
        };

        channel.failures += 1;
        channel.connected = false;
        if channel.failures <= kind.threshold(&self.config) {
            return false;
        }

        warn!(
            channel = name,
            failures = channel.failures,
            ?kind,
            "channel failed repeatedly, reconnecting"
        );
        self.reconnect(name);
        false
    }

    /// Closes the old handle and installs a fresh one at the same address.
    fn reconnect(&mut self, name: &str) {
        let Some(channel) = self.channels.get_mut(name) else {
            return;
        };

        if let Some(old) = channel.handle.take() {
            old.close();
        }
        channel.handle = open_socket(name, &channel.endpoint, &self.config.socket);
        channel.connected = channel.handle.is_some();
        channel.failures = 0;
        channel.reconnects += 1;

        info!(
            channel = name,
            address = %channel.endpoint,
            reconnects = channel.reconnects,
            "channel reconnected"
        );
    }

    /// Releases the handle for `name` and forgets the channel.
    pub fn close(&mut self, name: &str) {
        match self.channels.remove(name) {
            Some(channel) => {
                if let Some(handle) = channel.handle {
                    handle.close();
                }
                info!(channel = name, "channel closed");
            }
            None => debug!(channel = name, "close on missing channel"),
        }
    }

    pub fn close_all(&mut self) {
        for (name, channel) in self.channels.drain() {
            if let Some(handle) = channel.handle {
                handle.close();
            }
            debug!(channel = %name, "channel closed");
        }
    }

    /// Replaces every channel with the standard set for `addresses`, then
    /// runs the diagnostic send. Returns whether every diagnostic succeeded.
    pub async fn connect(&mut self, addresses: &AddressSet) -> bool {
        info!(host = %addresses.host, "connecting channels");
        self.host = addresses.host.trim().to_string();
        self.close_all();

        for (name, address) in addresses.iter() {
            if is_unconfigured(address) {
                debug!(channel = %name, "no address configured");
                continue;
            }
            self.create(name.as_str(), address);
        }

        self.log_status();
        self.run_diagnostics().await
    }

    /// Creates the standard set without touching existing channels.
    ///
    /// Skipped entirely when the host is empty or `"undefined"`. Returns the
    /// number of channels holding a live handle afterwards.
    pub fn create_standard(&mut self, addresses: &AddressSet) -> usize {
        self.host = addresses.host.trim().to_string();
        if !addresses.has_host() {
            warn!("server host is undefined; channels must be connected explicitly");
            return 0;
        }

        for (name, address) in addresses.iter() {
            if !is_unconfigured(address) {
                self.create(name.as_str(), address);
            }
        }
        self.log_status();
        self.channels.values().filter(|c| c.handle.is_some()).count()
    }

    /// Host configured and both hand channels hold a handle.
    pub fn is_healthy(&self) -> bool {
        is_configured_host(&self.host)
            && ChannelName::REQUIRED.iter().all(|name| {
                self.channels
                    .get(name.as_str())
                    .is_some_and(|c| c.handle.is_some())
            })
    }

    /// Sends a timestamped diagnostic on every channel.
    pub async fn run_diagnostics(&mut self) -> bool {
        let names = self.channel_names();
        if names.is_empty() {
            warn!("no channels available for diagnostics");
            return false;
        }

        let mut all_ok = true;
        for name in names {
            let payload = diagnostic_payload(&name, &Local::now());
            let ok = self.send(&name, payload).await;
            debug!(channel = %name, success = ok, "diagnostic send");
            all_ok &= ok;
        }
        info!(success = all_ok, "diagnostics completed");
        all_ok
    }

    pub fn log_status(&self) {
        let statuses = self.statuses();
        info!(host = %self.host, channels = statuses.len(), "channel status");
        for s in &statuses {
            info!(
                channel = %s.name,
                address = %s.address,
                connected = s.connected,
                has_handle = s.has_handle,
                failures = s.failures,
                reconnects = s.reconnects,
                "  channel"
            );
        }
    }

    pub fn status(&self, name: &str) -> Option<ChannelStatus> {
        self.channels.get(name).map(|c| c.status(name))
    }

    /// Every channel's status, ordered by name.
    pub fn statuses(&self) -> Vec<ChannelStatus> {
        let mut out: Vec<_> = self.channels.iter().map(|(n, c)| c.status(n)).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Channel names, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn failure_count(&self, name: &str) -> Option<u32> {
        self.channels.get(name).map(|c| c.failures)
    }

    pub fn reconnect_count(&self, name: &str) -> Option<u32> {
        self.channels.get(name).map(|c| c.reconnects)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Closes everything. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if !self.channels.is_empty() {
            info!(channels = self.channels.len(), "shutting down channel registry");
        }
        self.close_all();
    }

    fn log_send(&mut self, name: &str) {
        let now = Instant::now();
        let due = self
            .last_send_log
            .is_none_or(|last| now.duration_since(last) >= self.config.send_log_interval);
        if due {
            self.last_send_log = Some(now);
            debug!(channel = name, "frame sent");
        }
    }
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_socket(name: &str, endpoint: &Endpoint, options: &SocketOptions) -> Option<PushSocket> {
    match PushSocket::connect(endpoint.clone(), options) {
        Ok(socket) => Some(socket),
        Err(e) => {
            error!(channel = name, address = %endpoint, error = %e, "failed to open push socket");
            None
        }
    }
}

/// `DIAGNOSTIC_TEST_<name>_<HH:MM:SS.fff>`.
pub fn diagnostic_payload<Tz>(name: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{DIAGNOSTIC_PREFIX}_{name}_{}", at.format("%H:%M:%S%.3f"))
}
