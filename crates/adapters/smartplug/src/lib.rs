//! # toad-adapter-smartplug
//!
//! Smart-plug adapter: speaks the plugs' encrypted JSON protocol over TCP.
//!
//! ## Responsibilities
//! - Encrypt and decrypt protocol messages ([`codec`])
//! - Implement the `DeviceTransport` port: one connection per command, write,
//!   half-close, read the reply ([`client`])
//! - Emulate the device side of the protocol for tests and local runs
//!   ([`emulator`])
//!
//! ## Dependency rule
//! Same as other adapters: depends on `toad-app` and `toad-domain`.

pub mod client;
pub mod codec;
pub mod config;
pub mod emulator;
pub mod error;

pub use client::SmartPlugClient;
pub use codec::Codec;
pub use config::SmartPlugConfig;
pub use emulator::SmartPlugEmulator;
pub use error::{CodecError, SmartPlugError};
