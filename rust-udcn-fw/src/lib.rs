//! Forwarding plane for the µDCN NDN forwarder.
//!
//! This crate owns the parts of the system described as "the core" of the
//! forwarder: the Face/Link-Service abstraction, the FIB/RIB/PIT/CS tables,
//! the per-thread forwarding pipelines, the strategy registry, and the
//! management module that mutates tables via Interest-based control
//! messages. Concrete transports (QUIC, UDP, ...) live in sibling crates and
//! plug in through the [`face::Face`] capability trait.

pub mod config;
pub mod context;
pub mod error;
pub mod face;
pub mod link_service;
pub mod management;
pub mod packet;
pub mod pipeline;
pub mod strategy;
pub mod tables;

pub use context::ForwarderContext;
pub use error::{FwError, FwResult};
