//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `toad.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use toad_adapter_etcd::EtcdConfig;
use toad_adapter_mqtt::MqttConfig;
use toad_adapter_smartplug::SmartPlugConfig;
use toad_app::control_loop::ControlLoopConfig;
use toad_domain::grid::GridDimensions;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Message bus settings.
    pub mqtt: MqttConfig,
    /// Device registry settings.
    pub registry: RegistryConfig,
    /// Smart-plug command settings.
    pub command: SmartPlugConfig,
    /// Grid size.
    pub workspace: GridDimensions,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Registry store location plus refresh timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    #[serde(flatten)]
    pub etcd: EtcdConfig,
    /// Seconds between registry refreshes.
    pub poll_interval_secs: u64,
    /// Snapshot age, in seconds, after which refresh failures are logged as errors.
    pub stale_after_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `toad.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("toad.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("TOAD_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = var("TOAD_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = var("TOAD_ETCD_ENDPOINT") {
            self.registry.etcd.endpoint = val;
        }
        if let Some(val) = var("TOAD_ETCD_NAMESPACE") {
            self.registry.etcd.namespace = val;
        }
        if let Some(val) = var("TOAD_SHARED_KEY") {
            self.command.shared_key = val;
        }
        if let Some(val) = var("TOAD_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.mqtt.broker_port == 0, "mqtt.broker_port must be non-zero"),
            (
                self.mqtt.base_topic.trim_matches(['/', '#']).is_empty(),
                "mqtt.base_topic must not be empty",
            ),
            (
                self.mqtt.connect_timeout_secs == 0,
                "mqtt.connect_timeout_secs must be non-zero",
            ),
            (
                self.registry.poll_interval_secs == 0,
                "registry.poll_interval_secs must be non-zero",
            ),
            (
                self.registry.etcd.request_timeout_secs == 0,
                "registry.request_timeout_secs must be non-zero",
            ),
            (self.command.timeout_secs == 0, "command.timeout_secs must be non-zero"),
            (
                self.command.max_response_bytes == 0,
                "command.max_response_bytes must be non-zero",
            ),
            (
                self.command.shared_key.is_empty(),
                "command.shared_key must be set (or TOAD_SHARED_KEY)",
            ),
            (
                self.workspace.columns_per_row == 0 || self.workspace.rows_per_column == 0,
                "workspace dimensions must be non-zero",
            ),
        ];
        match checks.into_iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(ConfigError::Validation(reason.to_string())),
            None => Ok(()),
        }
    }

    /// Timing of the control loop.
    #[must_use]
    pub fn control_loop(&self) -> ControlLoopConfig {
        ControlLoopConfig {
            poll_interval: Duration::from_secs(self.registry.poll_interval_secs),
            stale_after: Duration::from_secs(self.registry.stale_after_secs),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            etcd: EtcdConfig::default(),
            poll_interval_secs: 10,
            stale_after_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "toad_controllerd=info,toad=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.command.shared_key = "secret".to_string();
        config
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.mqtt.broker_host, "localhost");
        assert_eq!(config.mqtt.base_topic, "toad");
        assert_eq!(config.registry.etcd.endpoint, "http://localhost:2379");
        assert_eq!(config.registry.poll_interval_secs, 10);
        assert_eq!(config.command.timeout_secs, 5);
        assert_eq!(config.workspace, GridDimensions::new(8, 8));
        assert_eq!(config.logging.filter, "toad_controllerd=info,toad=info");
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.mqtt.broker_port, 1883);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [mqtt]
            broker_host = 'broker.lab'
            broker_port = 1884
            base_topic = 'lab'

            [registry]
            endpoint = 'http://etcd.lab:2379'
            namespace = 'lab/plugs'
            poll_interval_secs = 30
            stale_after_secs = 600

            [command]
            timeout_secs = 2
            shared_key = 'hunter2'

            [workspace]
            columns_per_row = 4
            rows_per_column = 3

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mqtt.broker_host, "broker.lab");
        assert_eq!(config.mqtt.broker_port, 1884);
        assert_eq!(config.mqtt.base_topic, "lab");
        assert_eq!(config.registry.etcd.endpoint, "http://etcd.lab:2379");
        assert_eq!(config.registry.etcd.namespace, "lab/plugs");
        assert_eq!(config.registry.etcd.request_timeout_secs, 5);
        assert_eq!(config.registry.poll_interval_secs, 30);
        assert_eq!(config.command.timeout_secs, 2);
        assert_eq!(config.command.shared_key, "hunter2");
        assert_eq!(config.workspace, GridDimensions::new(4, 3));
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.control_loop().stale_after, Duration::from_secs(600));
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.mqtt.broker_port, 1883);
    }

    #[test]
    fn should_apply_overrides_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TOAD_MQTT_HOST", "mqtt.internal"),
            ("TOAD_MQTT_PORT", "2883"),
            ("TOAD_ETCD_ENDPOINT", "http://etcd.internal:2379"),
            ("TOAD_ETCD_NAMESPACE", "prod/plugs"),
            ("TOAD_SHARED_KEY", "from-env"),
            ("TOAD_LOG", "warn"),
        ]);
        let mut config = Config::default();

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.mqtt.broker_host, "mqtt.internal");
        assert_eq!(config.mqtt.broker_port, 2883);
        assert_eq!(config.registry.etcd.endpoint, "http://etcd.internal:2379");
        assert_eq!(config.registry.etcd.namespace, "prod/plugs");
        assert_eq!(config.command.shared_key, "from-env");
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_prefer_rust_log_and_ignore_bad_port() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TOAD_LOG", "warn"),
            ("RUST_LOG", "trace"),
            ("TOAD_MQTT_PORT", "not-a-port"),
        ]);
        let mut config = Config::default();

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.logging.filter, "trace");
        assert_eq!(config.mqtt.broker_port, 1883);
    }

    #[test]
    fn should_accept_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn should_require_shared_key() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: command.shared_key must be set (or TOAD_SHARED_KEY)"
        );
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = valid();
        config.mqtt.broker_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_empty_base_topic() {
        let mut config = valid();
        config.mqtt.base_topic = "/#".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_grid_dimension() {
        let mut config = valid();
        config.workspace.rows_per_column = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_poll_interval() {
        let mut config = valid();
        config.registry.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
