//! Face abstraction (spec §2 item 1, §3 "Face record", §4.1, §9
//! "Polymorphic transports").
//!
//! A face is a bidirectional link-level channel. The forwarding plane never
//! speaks to a concrete transport directly; it only ever holds a
//! `Arc<dyn Face>` obtained from the face table. New transports are added by
//! implementing this trait, not by teaching the pipeline about them.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Unique 64-bit identifier for a face (spec §2 item 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u64);

impl FaceId {
    /// Reserved pseudo-source used to mark Data that was served from the
    /// Content Store rather than received on a real face (spec §4.3,
    /// incoming Data pipeline step 3: "except the CS pseudo-source 0").
    pub const CONTENT_STORE: FaceId = FaceId(0);
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face{}", self.0)
    }
}

/// Whether the face's peer is reachable without crossing an
/// administrative boundary. Management Interests are only dispatched for
/// faces with `Scope::Local` (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    NonLocal,
}

/// Link-layer topology of the face's peer relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    PointToPoint,
    MultiAccess,
    AdHoc,
}

/// Lifecycle policy (spec §3 "Face record").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistency {
    /// Reconnects on error; face ID stays stable across reconnects.
    Permanent,
    /// Expires after an idle period; does not reconnect.
    OnDemand,
    /// Neither reconnects nor expires.
    Persistent,
}

/// Per-face packet/byte counters, read by the `status`/`faces list`
/// management verbs.
#[derive(Debug, Default)]
pub struct FaceCounters {
    pub in_interests: AtomicU64,
    pub in_data: AtomicU64,
    pub out_interests: AtomicU64,
    pub out_data: AtomicU64,
    pub in_bytes: AtomicU64,
    pub out_bytes: AtomicU64,
    pub dropped: AtomicU64,
}

impl FaceCounters {
    pub fn snapshot(&self) -> FaceCountersSnapshot {
        FaceCountersSnapshot {
            in_interests: self.in_interests.load(Ordering::Relaxed),
            in_data: self.in_data.load(Ordering::Relaxed),
            out_interests: self.out_interests.load(Ordering::Relaxed),
            out_data: self.out_data.load(Ordering::Relaxed),
            in_bytes: self.in_bytes.load(Ordering::Relaxed),
            out_bytes: self.out_bytes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct FaceCountersSnapshot {
    pub in_interests: u64,
    pub in_data: u64,
    pub out_interests: u64,
    pub out_data: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub dropped: u64,
}

/// The capability set a transport must provide (spec §9). Generic link
/// services and the forwarding pipeline are written against this trait
/// alone; they are never aware of the concrete transport behind it.
#[async_trait]
pub trait Face: Send + Sync {
    /// Stable identity of this face.
    fn id(&self) -> FaceId;

    fn remote_uri(&self) -> &str;
    fn local_uri(&self) -> &str;
    fn scope(&self) -> Scope;
    fn link_kind(&self) -> LinkKind;
    fn persistency(&self) -> Persistency;
    fn mtu(&self) -> usize;
    fn is_running(&self) -> bool;
    fn counters(&self) -> &FaceCounters;

    /// Sends a single opaque link-layer frame. Non-blocking: implementers
    /// must not await backpressure indefinitely. Refuses (drops, logs, no
    /// error to caller) if `frame.len() > mtu()` or the face is down —
    /// spec §4.1.
    async fn send_frame(&self, frame: bytes::Bytes);

    /// Idempotent: calling `close()` on an already-closed face is a no-op.
    fn close(&self);
}

/// Process-wide record describing a face, independent of the transport
/// implementation behind it (spec §3 "Face record"). Bundles the face's
/// NDNLP [`LinkService`](crate::link_service::LinkService) — the pipeline
/// never talks to a `Face` directly without going through it.
pub struct FaceRecord {
    pub face: std::sync::Arc<dyn Face>,
    pub link_service: crate::link_service::LinkService,
    pub expiration: Option<Instant>,
    running: AtomicBool,
}

impl FaceRecord {
    pub fn new(face: std::sync::Arc<dyn Face>) -> Self {
        Self {
            link_service: crate::link_service::LinkService::new(
                crate::link_service::LinkServiceOptions::default(),
            ),
            face,
            expiration: None,
            running: AtomicBool::new(true),
        }
    }

    pub fn with_on_demand_expiration(mut self, idle: Duration) -> Self {
        self.expiration = Some(Instant::now() + idle);
        self
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expiration, Some(t) if Instant::now() >= t)
    }

    pub fn mark_closed(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_marked_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_store_pseudo_source_is_zero() {
        assert_eq!(FaceId::CONTENT_STORE.0, 0);
    }
}
