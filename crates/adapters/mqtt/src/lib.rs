//! # toad-adapter-mqtt
//!
//! MQTT adapter: the controller's message bus.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and wait for it to accept the session
//! - Forward every inbound publish into an `mpsc` channel for the control loop
//! - Implement the `Bus` port: subscribe, publish, disconnect
//! - Re-subscribe after the event loop reconnects
//!
//! ## Dependency rule
//! Same as other adapters: depends on `toad-app` and `toad-domain`.

pub mod bus;
pub mod config;
pub mod error;

pub use bus::MqttBus;
pub use config::MqttConfig;
pub use error::MqttError;
