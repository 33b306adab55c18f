//! `tcp://host:port` endpoint parsing.

use std::fmt;
use std::str::FromStr;

use teleop_protocol::constants::{ADDRESS_SCHEME, UNCONFIGURED_ADDRESS};

use crate::error::TransportError;

/// Returns `true` for the placeholder address used when no host is known.
///
/// Blank input counts as unconfigured too.
pub fn is_unconfigured(address: &str) -> bool {
    let address = address.trim();
    address.is_empty() || address == UNCONFIGURED_ADDRESS
}

/// A parsed `tcp://host:port` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parses a transport address.
    ///
    /// The placeholder `tcp://:` and addresses with an empty host or port
    /// yield [`TransportError::Unconfigured`]; they must never be dialed.
    pub fn parse(address: &str) -> Result<Self, TransportError> {
        let trimmed = address.trim();
        if is_unconfigured(trimmed) {
            return Err(TransportError::Unconfigured);
        }

        let invalid = |reason| TransportError::InvalidEndpoint {
            address: address.to_string(),
            reason,
        };

        let rest = trimmed
            .strip_prefix(ADDRESS_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| invalid("expected tcp:// scheme"))?;
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() || port.is_empty() {
            return Err(TransportError::Unconfigured);
        }
        if host.contains('/') {
            return Err(invalid("host contains a path separator"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("port is not a number in 0..=65535"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{ADDRESS_SCHEME}://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{ADDRESS_SCHEME}://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
