//! # toad-domain
//!
//! Pure domain model for the toad smart-plug grid controller.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Name devices on the grid (**grid identifiers**) and where to reach them
//!   (**device addresses**)
//! - Hold the **registry snapshot** mapping one to the other
//! - Decode **inbound commands** and resolve them into target addresses
//! - Describe the **device command** wire shape and per-device **outcomes**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod address;
pub mod command;
pub mod grid;
pub mod outcome;
pub mod registry;
pub mod relay;
pub mod resolver;
