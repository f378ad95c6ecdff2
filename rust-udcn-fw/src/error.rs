//! Error taxonomy for the forwarding plane (spec §7).
//!
//! Pipeline stages never propagate these past the thread boundary: each
//! stage is total and converts an error into a counter bump and a log line
//! at the point it is detected. This type exists for the boundary code
//! (management, face setup, startup) that does need to return a `Result`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FwError {
    /// TLV parse failure or a signed Interest whose digest does not match.
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// A management Interest arrived on a non-local face.
    #[error("management request from non-local face")]
    NonLocal,

    /// Bad ControlParameters: reported back to the requester as a
    /// ControlResponse status code, never surfaced as a Rust error past the
    /// management module boundary.
    #[error("table constraint violated: {0}")]
    TableConstraint(String),

    /// Face send/receive I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A bounded queue (per-thread inbound, per-face outbound) is full.
    #[error("overload: {0}")]
    Overload(String),

    /// Unrecoverable startup failure; the only category allowed to
    /// terminate the process.
    #[error("fatal: {0}")]
    Fatal(String),
}

pub type FwResult<T> = std::result::Result<T, FwError>;

impl From<rust_udcn_common::Error> for FwError {
    fn from(e: rust_udcn_common::Error) -> Self {
        FwError::Malformed(e.to_string())
    }
}
