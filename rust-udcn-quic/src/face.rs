//! QUIC face implementing the forwarding plane's `Face` capability trait.
//!
//! A `QuicFace` is a thin transport adapter: it turns a single NDNLP frame
//! into one QUIC unidirectional stream and back. Fragmentation, reassembly,
//! and sequence numbering are the link service's job
//! (`rust_udcn_fw::link_service`), not this crate's — NDNLP runs above
//! every transport identically, so a face only has to move opaque bytes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use quinn::Connection;
use rust_udcn_fw::face::{Face, FaceCounters, FaceId, LinkKind, Persistency, Scope};

/// An NDN face backed by a single QUIC connection.
pub struct QuicFace {
    id: FaceId,
    connection: Connection,
    remote_uri: String,
    local_uri: String,
    scope: Scope,
    persistency: Persistency,
    mtu: usize,
    running: AtomicBool,
    counters: FaceCounters,
}

impl fmt::Debug for QuicFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuicFace")
            .field("id", &self.id)
            .field("remote_uri", &self.remote_uri)
            .finish()
    }
}

impl QuicFace {
    pub fn new(id: FaceId, connection: Connection, scope: Scope, persistency: Persistency, mtu: usize) -> Self {
        let remote_uri = format!("quic://{}", connection.remote_address());
        let local_uri = connection
            .local_ip()
            .map(|ip| format!("quic://{ip}"))
            .unwrap_or_else(|| "quic://0.0.0.0".to_string());
        Self {
            id,
            connection,
            remote_uri,
            local_uri,
            scope,
            persistency,
            mtu,
            running: AtomicBool::new(true),
            counters: FaceCounters::default(),
        }
    }

    /// The underlying QUIC connection, used by the listener's read loop to
    /// accept incoming unidirectional streams.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

#[async_trait]
impl Face for QuicFace {
    fn id(&self) -> FaceId {
        self.id
    }

    fn remote_uri(&self) -> &str {
        &self.remote_uri
    }

    fn local_uri(&self) -> &str {
        &self.local_uri
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn link_kind(&self) -> LinkKind {
        LinkKind::PointToPoint
    }

    fn persistency(&self) -> Persistency {
        self.persistency
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && self.connection.close_reason().is_none()
    }

    fn counters(&self) -> &FaceCounters {
        &self.counters
    }

    async fn send_frame(&self, frame: Bytes) {
        if !self.is_running() {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if frame.len() > self.mtu {
            warn!("[{}] dropping oversized frame of {} bytes (mtu {})", self.id, frame.len(), self.mtu);
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut stream = match self.connection.open_uni().await {
            Ok(s) => s,
            Err(e) => {
                debug!("[{}] failed to open uni stream: {e}", self.id);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        if let Err(e) = stream.write_all(&frame).await {
            debug!("[{}] write failed: {e}", self.id);
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if let Err(e) = stream.finish().await {
            debug!("[{}] stream finish failed: {e}", self.id);
        }
        self.counters.out_bytes.fetch_add(frame.len() as u64, Ordering::Relaxed);
    }

    fn close(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            self.connection.close(0u32.into(), b"face closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_id_display_matches_forwarder_convention() {
        let id = FaceId(7);
        assert_eq!(format!("{id}"), "face7");
    }
}
