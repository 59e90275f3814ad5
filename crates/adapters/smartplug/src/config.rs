//! Smart-plug command configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for talking to smart plugs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmartPlugConfig {
    /// Upper bound for one command exchange (connect, write, read), in seconds.
    pub timeout_secs: u64,
    /// Largest reply read from a device, in bytes.
    pub max_response_bytes: usize,
    /// Secret shared with the devices; the encryption key is derived from it.
    pub shared_key: String,
}

impl SmartPlugConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SmartPlugConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_response_bytes: 2048,
            shared_key: String::new(),
        }
    }
}
