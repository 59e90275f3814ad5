//! # toad-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RegistrySource`: fetch the identifier → address registry
//!   - `DeviceTransport`: deliver one relay command to one smart plug
//!   - `Bus`: subscribe, publish and disconnect on the message bus
//! - Own the **registry cache** and its background refresher
//! - Fan commands out to devices through the **dispatcher**
//! - Drive everything from the **control loop** until told to stop
//! - Provide an **in-process bus** that doesn't need a broker
//!
//! ## Dependency rule
//! Depends on `toad-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod control_loop;
pub mod dispatcher;
pub mod in_process_bus;
pub mod pipeline;
pub mod ports;
pub mod registry_cache;
