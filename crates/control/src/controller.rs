//! Per-tick orchestration of the outbound link.

use std::time::Duration;

use tracing::{debug, info, warn};

use teleop_channels::{AddressSet, ChannelRegistry, KeepAlive, RegistryConfig};
use teleop_protocol::constants::{CONNECT_RETRY_INTERVAL, KEEPALIVE_PERIOD};
use teleop_protocol::{ChannelName, Position, ResolutionState, encode_hand_frame};
use teleop_settings::NetworkSettings;

use crate::attempt::AttemptGate;
use crate::mode::{Gestures, Mode, ModeMachine};
use crate::presentation::{Presentation, UiHints};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub registry: RegistryConfig,
    /// Spacing between connection attempts while unhealthy.
    pub retry_interval: Duration,
    pub keepalive_period: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            retry_interval: CONNECT_RETRY_INTERVAL,
            keepalive_period: KEEPALIVE_PERIOD,
        }
    }
}

/// Everything the host collects for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    pub settings: &'a NetworkSettings,
    /// `None` while the gesture hand is not tracked.
    pub gestures: Option<Gestures>,
    pub right_hand: &'a [Position],
    pub left_hand: &'a [Position],
    pub resolution: ResolutionState,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Unhealthy and no attempt was allowed.
    Idle,
    /// A connect ran; `healthy` is the registry health afterwards.
    Connected { healthy: bool },
    /// Healthy tick; `sent` counts frames delivered.
    Streamed { mode: Mode, sent: usize },
}

/// Builds the outbound address set from the live settings.
pub fn address_set(settings: &NetworkSettings) -> AddressSet {
    AddressSet {
        host: settings.host().to_string(),
        right_hand: settings.channel_address(ChannelName::RightHand),
        left_hand: settings.channel_address(ChannelName::LeftHand),
        resolution: settings.channel_address(ChannelName::Resolution),
        pause: settings.channel_address(ChannelName::Pause),
    }
}

/// Owns the registry, the mode machine, and the last connection attempt.
pub struct TeleopController {
    registry: ChannelRegistry,
    modes: ModeMachine,
    gate: AttemptGate,
    keepalive: KeepAlive,
}

impl TeleopController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            registry: ChannelRegistry::new(config.registry),
            modes: ModeMachine::new(),
            gate: AttemptGate::new(config.retry_interval),
            keepalive: KeepAlive::new(config.keepalive_period),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn is_healthy(&self) -> bool {
        self.registry.is_healthy()
    }

    pub fn keepalive_period(&self) -> Duration {
        self.keepalive.period()
    }

    pub async fn tick<P: Presentation>(&mut self, input: &TickInput<'_>, ui: &mut P) -> TickOutcome {
        let addresses = address_set(input.settings);

        if !self.registry.is_healthy() {
            ui.apply_hints(UiHints::disconnected());
            if !addresses.has_host() || !self.gate.allows(&addresses) {
                return TickOutcome::Idle;
            }
            return self.connect(addresses, ui).await;
        }

        if self.gate.address_changed(&addresses) {
            info!(host = %addresses.host, "server addresses changed, reconnecting");
            self.registry.close_all();
            return self.connect(addresses, ui).await;
        }

        if let Some(gestures) = input.gestures
            && let Some(transition) = self.modes.apply(gestures)
        {
            info!(
                from = %transition.from,
                to = %transition.to,
                should_continue = transition.should_continue,
                "mode changed"
            );
            ui.apply_hints(transition.hints);
        }

        let mut sent = 0;
        let pause = self.modes.pause_state();
        if self.registry.send(ChannelName::Resolution.as_str(), input.resolution.as_str()).await {
            sent += 1;
        }
        if self.registry.send(ChannelName::Pause.as_str(), pause.as_str()).await {
            sent += 1;
        }

        let mode = self.modes.mode();
        if let Some(marker) = mode.marker() {
            let right = encode_hand_frame(marker, input.right_hand);
            let left = encode_hand_frame(marker, input.left_hand);
            if self.registry.send(ChannelName::RightHand.as_str(), right).await {
                sent += 1;
            }
            if self.registry.send(ChannelName::LeftHand.as_str(), left).await {
                sent += 1;
            }
        }

        TickOutcome::Streamed { mode, sent }
    }

    async fn connect<P: Presentation>(&mut self, addresses: AddressSet, ui: &mut P) -> TickOutcome {
        let diagnostics = self.registry.connect(&addresses).await;
        let healthy = self.registry.is_healthy();
        if healthy {
            info!(host = %addresses.host, diagnostics, "connected");
            ui.apply_hints(UiHints::connected());
        } else {
            warn!(host = %addresses.host, "connection attempt left link unhealthy");
            ui.apply_hints(UiHints::disconnected());
        }
        self.gate.record(addresses, healthy);
        TickOutcome::Connected { healthy }
    }

    /// Opens the standard channel set at startup, skipping diagnostics.
    ///
    /// Returns the number of live channels. An undefined host opens nothing
    /// and leaves the first tick free to connect.
    pub fn open_standard<P: Presentation>(&mut self, settings: &NetworkSettings, ui: &mut P) -> usize {
        let addresses = address_set(settings);
        let opened = self.registry.create_standard(&addresses);
        if opened == 0 {
            return 0;
        }

        let healthy = self.registry.is_healthy();
        info!(host = %addresses.host, opened, healthy, "standard channels opened");
        ui.apply_hints(if healthy {
            UiHints::connected()
        } else {
            UiHints::disconnected()
        });
        self.gate.record(addresses, healthy);
        opened
    }

    /// Runs one keep-alive cycle; returns the pings delivered.
    pub async fn keepalive(&mut self) -> usize {
        self.keepalive.run_cycle(&mut self.registry).await
    }

    /// Closes every channel and forgets the last attempt.
    pub fn disconnect<P: Presentation>(&mut self, ui: &mut P) {
        debug!("disconnecting controller");
        self.registry.shutdown();
        self.gate.reset();
        ui.apply_hints(UiHints::disconnected());
    }
}
