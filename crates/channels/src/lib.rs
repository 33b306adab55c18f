//! Outbound channel registry for the teleop link.
//!
//! [`ChannelRegistry`] owns one [`PushSocket`](teleop_transport::PushSocket)
//! per named channel, counts consecutive send failures and rebuilds a
//! channel's socket in place once failures cross a threshold. [`KeepAlive`]
//! pings every channel on a fixed period while the registry is healthy.

pub mod keepalive;
pub mod registry;
pub mod types;

pub use keepalive::KeepAlive;
pub use registry::ChannelRegistry;
pub use types::{AddressSet, ChannelStatus, FailureKind, RegistryConfig};
