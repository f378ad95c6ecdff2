//! QUIC transport for the µDCN forwarder.
//!
//! Implements the [`rust_udcn_fw::face::Face`] capability trait over QUIC
//! connections. NDNLP fragmentation, reassembly, and congestion marking are
//! handled generically by `rust_udcn_fw::link_service` above this layer —
//! this crate only has to move opaque frames and register/unregister faces.

mod config;
mod face;
mod listener;

pub use config::{ClientOptions, ServerOptions};
pub use face::QuicFace;
pub use listener::{connect, request, run_server};

/// Default QUIC port for NDN.
pub const NDN_QUIC_PORT: u16 = 6367;

/// ALPN protocol string advertised for NDN over QUIC.
pub const NDN_QUIC_ALPN: &[u8] = b"ndn1";

/// MTU assumed for QUIC faces. NDNLP fragments outgoing packets to this
/// size before ever calling `send_frame`; QUIC streams themselves have no
/// inherent size limit.
pub const DEFAULT_MTU: usize = 1400;
