//! Server address and per-channel ports.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use teleop_protocol::ChannelName;
use teleop_protocol::constants::{ADDRESS_SCHEME, UNCONFIGURED_ADDRESS, is_configured_host};

use crate::error::SettingsError;
use crate::ip::{is_valid_ipv4, normalize_ipv4_input};

/// Network settings as stored in `Network.json`.
///
/// Ports are kept as text; JSON numbers are accepted too. Every field is
/// optional and missing ones produce the `tcp://:` placeholder address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    #[serde(rename = "IPAddress", alias = "ip_address")]
    pub ip_address: String,
    #[serde(rename = "rightkeyptPortNum", alias = "right_hand_port", deserialize_with = "port")]
    pub right_hand_port: String,
    #[serde(rename = "leftkeyptPortNum", alias = "left_hand_port", deserialize_with = "port")]
    pub left_hand_port: String,
    #[serde(rename = "camPortNum", alias = "camera_port", deserialize_with = "port")]
    pub camera_port: String,
    #[serde(rename = "graphPortNum", alias = "graph_port", deserialize_with = "port")]
    pub graph_port: String,
    #[serde(rename = "resolutionPortNum", alias = "resolution_port", deserialize_with = "port")]
    pub resolution_port: String,
    #[serde(rename = "PausePortNum", alias = "pause_port", deserialize_with = "port")]
    pub pause_port: String,
    /// Keeps the inbound streams stopped while set.
    #[serde(rename = "ForceDisconnect", alias = "force_disconnect")]
    pub force_disconnect: bool,
}

fn port<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u16),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(s) => s.trim().to_string(),
        Port::Number(n) => n.to_string(),
    })
}

impl NetworkSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&content)?;
        info!(path = %path.display(), host = %settings.ip_address, "network settings loaded");
        Ok(settings)
    }

    /// Whether a server host is set (non-empty and not `"undefined"`).
    pub fn has_host(&self) -> bool {
        is_configured_host(&self.ip_address)
    }

    pub fn host(&self) -> &str {
        self.ip_address.trim()
    }

    /// Normalizes and validates `raw` before storing it as the server host.
    pub fn set_ip_address(&mut self, raw: &str) -> Result<(), SettingsError> {
        let ip = normalize_ipv4_input(raw);
        if !is_valid_ipv4(&ip) {
            debug!(raw, normalized = %ip, "rejected server address");
            return Err(SettingsError::InvalidIpv4(raw.to_string()));
        }
        self.ip_address = ip;
        Ok(())
    }

    /// `tcp://host:port`, or the placeholder when host or port is missing.
    pub fn address_for_port(&self, port: &str) -> String {
        let port = port.trim();
        if !self.has_host() || port.is_empty() {
            return UNCONFIGURED_ADDRESS.to_string();
        }
        format!("{ADDRESS_SCHEME}://{}:{port}", self.host())
    }

    pub fn channel_address(&self, name: ChannelName) -> String {
        let port = match name {
            ChannelName::RightHand => &self.right_hand_port,
            ChannelName::LeftHand => &self.left_hand_port,
            ChannelName::Resolution => &self.resolution_port,
            ChannelName::Pause => &self.pause_port,
        };
        self.address_for_port(port)
    }

    pub fn camera_address(&self) -> String {
        self.address_for_port(&self.camera_port)
    }

    pub fn graph_address(&self) -> String {
        self.address_for_port(&self.graph_port)
    }
}
