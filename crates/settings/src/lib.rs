//! Server address settings for the teleop link.
//!
//! [`NetworkSettings`] reads the `Network.json` layout (server IP plus one
//! port per channel) and builds `tcp://host:port` addresses, yielding the
//! `tcp://:` placeholder for anything not configured. The [`ip`] helpers
//! clean up hand-typed IPv4 input.

pub mod error;
pub mod ip;
pub mod network;

pub use error::SettingsError;
pub use ip::{is_valid_ipv4, normalize_ipv4_input};
pub use network::NetworkSettings;
