//! Common types and utilities for the micro Data-Centric Networking (μDCN) implementation.
//!
//! This crate provides the NDN packet/TLV model and metrics kit shared by
//! the forwarding plane and every transport crate in the workspace.

pub mod ndn;
pub mod tlv;
pub mod metrics;
pub mod error;

/// Reexport of common types
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
