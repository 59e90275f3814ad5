//! # toad-adapter-etcd
//!
//! etcd adapter: the smart-plug registry lives under one etcd key prefix,
//! one key per grid identifier, the device address as value:
//!
//! ```text
//! toad/smartplugs/w.r0.c0 = 10.0.0.17:9999
//! toad/smartplugs/w.r0.c1 = 10.0.0.18
//! ```
//!
//! ## Responsibilities
//! - Implement the `RegistrySource` port with a single prefix range read
//!   against the etcd v3 JSON gateway (`POST /v3/kv/range`)
//!
//! ## Dependency rule
//! Same as other adapters: depends on `toad-app` and `toad-domain`.

pub mod config;
pub mod error;
pub mod registry;

pub use config::EtcdConfig;
pub use error::EtcdError;
pub use registry::EtcdRegistry;
