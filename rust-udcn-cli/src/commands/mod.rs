//! Subcommand implementations for the µDCN CLI.

pub mod daemon;
pub mod interest;
pub mod management;
