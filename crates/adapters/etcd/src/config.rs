//! etcd registry configuration.

use std::time::Duration;

use serde::Deserialize;

/// Where and how to read the device registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtcdConfig {
    /// Base URL of the etcd gRPC gateway.
    pub endpoint: String,
    /// Key prefix holding one entry per grid identifier, without trailing `/`.
    pub namespace: String,
    /// Timeout of one range request, in seconds.
    pub request_timeout_secs: u64,
}

impl EtcdConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:2379".to_string(),
            namespace: "toad/smartplugs".to_string(),
            request_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = EtcdConfig::default();
        assert_eq!(config.endpoint, "http://localhost:2379");
        assert_eq!(config.namespace, "toad/smartplugs");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            endpoint = "http://etcd.lab:2379"
            namespace = "lab/plugs"
            request_timeout_secs = 2
        "#;
        let config: EtcdConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.endpoint, "http://etcd.lab:2379");
        assert_eq!(config.namespace, "lab/plugs");
        assert_eq!(config.request_timeout_secs, 2);
    }
}
