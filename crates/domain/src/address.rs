//! Device address: where a smart plug listens for direct commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Port smart plugs listen on when the registry entry does not name one.
pub const DEFAULT_DEVICE_PORT: u16 = 9999;

/// Transport address of a smart plug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
}

impl DeviceAddress {
    /// Create an address from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Why a registry value could not be read as a [`DeviceAddress`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// The value is empty or only whitespace.
    #[error("empty device address")]
    Empty,

    /// The part after the last `:` is not a port number.
    #[error("invalid port in device address {0:?}")]
    InvalidPort(String),
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    /// Parse `host:port`, or a bare `host` on [`DEFAULT_DEVICE_PORT`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressParseError::Empty);
        }
        match s.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port = port
                    .parse()
                    .map_err(|_| AddressParseError::InvalidPort(s.to_string()))?;
                Ok(Self::new(host, port))
            }
            Some(_) => Err(AddressParseError::Empty),
            None => Ok(Self::new(s, DEFAULT_DEVICE_PORT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_host_and_port() {
        let addr: DeviceAddress = "10.0.0.7:9999".parse().unwrap();
        assert_eq!(addr, DeviceAddress::new("10.0.0.7", 9999));
    }

    #[test]
    fn should_use_default_port_for_bare_host() {
        let addr: DeviceAddress = " plug-3.local ".parse().unwrap();
        assert_eq!(addr.host, "plug-3.local");
        assert_eq!(addr.port, DEFAULT_DEVICE_PORT);
    }

    #[test]
    fn should_reject_empty_value() {
        assert_eq!("  ".parse::<DeviceAddress>(), Err(AddressParseError::Empty));
        assert_eq!(":80".parse::<DeviceAddress>(), Err(AddressParseError::Empty));
    }

    #[test]
    fn should_reject_invalid_port() {
        let result = "10.0.0.7:http".parse::<DeviceAddress>();
        assert!(matches!(result, Err(AddressParseError::InvalidPort(_))));
    }

    #[test]
    fn should_display_as_host_colon_port() {
        assert_eq!(DeviceAddress::new("h", 1).to_string(), "h:1");
    }
}
