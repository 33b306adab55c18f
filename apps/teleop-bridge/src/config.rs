//! Bridge configuration.
//!
//! Stored as TOML, by default at:
//! - Linux: `~/.config/teleop-link/bridge.toml`
//! - Windows: `%APPDATA%/teleop-link/bridge.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use teleop_channels::RegistryConfig;
use teleop_control::ControllerConfig;
use teleop_protocol::ResolutionState;
use teleop_settings::NetworkSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Controller ticks per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Spacing between connection attempts while unhealthy.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Resolution reported on the Resolution channel.
    #[serde(default)]
    pub resolution: ResolutionState,

    #[serde(default = "default_true")]
    pub camera_enabled: bool,

    #[serde(default = "default_true")]
    pub graph_enabled: bool,

    /// Optional `Network.json` that is re-read whenever it changes.
    #[serde(default)]
    pub network_file: Option<PathBuf>,

    /// Server address and ports. Overridden by `network_file` when set.
    #[serde(default)]
    pub network: NetworkSettings,
}

fn default_tick_hz() -> u32 {
    30
}

fn default_keepalive_secs() -> u64 {
    5
}

fn default_send_timeout_ms() -> u64 {
    10
}

fn default_retry_interval_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkSettings::default(),
            network_file: None,
            tick_hz: default_tick_hz(),
            keepalive_secs: default_keepalive_secs(),
            send_timeout_ms: default_send_timeout_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            resolution: ResolutionState::default(),
            camera_enabled: true,
            graph_enabled: true,
        }
    }
}

impl Config {
    /// Loads `path`, or the platform default location when `None`.
    ///
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    pub fn keepalive_period(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            registry: RegistryConfig {
                send_timeout: Duration::from_millis(self.send_timeout_ms),
                ..RegistryConfig::default()
            },
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            keepalive_period: self.keepalive_period(),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("teleop-link").join("bridge.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("teleop-link")
            .join("bridge.toml")
    }
}
