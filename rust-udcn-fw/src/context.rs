//! Process-wide context object (spec §9: "Global face table and strategy
//! registry ... Encapsulate as an explicit context object constructed at
//! startup and threaded through all components; avoid ambient globals").

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_udcn_common::metrics::UdcnMetrics;

use crate::face::{Face, FaceId, FaceRecord};
use crate::tables::{Fib, Rib, StrategyTable};

/// Live `tables.cs.admit`/`serve`/`capacity` knobs (spec §4.4 `cs config`,
/// §6), shared across every forwarding thread's Content Store shard. There
/// is no single process-wide Content Store to mutate directly (spec §5
/// sharding) — each shard polls this on its periodic tick and applies it to
/// its own `ContentStore`.
#[derive(Debug, Clone, Copy)]
pub struct CsPolicyState {
    pub admit: bool,
    pub serve: bool,
    pub capacity: usize,
}

impl Default for CsPolicyState {
    fn default() -> Self {
        Self {
            admit: true,
            serve: true,
            capacity: 65536,
        }
    }
}

#[derive(Default)]
pub struct CsPolicy {
    state: RwLock<CsPolicyState>,
}

impl CsPolicy {
    /// Overwrites whichever fields are `Some`, leaving the rest untouched.
    pub fn apply(&self, admit: Option<bool>, serve: Option<bool>, capacity: Option<usize>) {
        let mut state = self.state.write().unwrap();
        if let Some(v) = admit {
            state.admit = v;
        }
        if let Some(v) = serve {
            state.serve = v;
        }
        if let Some(v) = capacity {
            state.capacity = v;
        }
    }

    pub fn get(&self) -> CsPolicyState {
        *self.state.read().unwrap()
    }
}

/// Callback a transport registers at startup to open an on-demand outbound
/// face for the `faces create` management verb (spec §4.4). Kept as a
/// callback rather than a dependency on a concrete transport crate, since
/// `rust-udcn-fw` has no dependency on `rust-udcn-quic` (spec §9
/// "Polymorphic transports").
pub type FaceOpener = dyn Fn(String, String) + Send + Sync;

/// Face Table & Dispatcher (spec §2 item 6): process-wide registry mapping
/// Face ID to its face/link-service pair. Rare mutation (face add/remove),
/// frequent lookup from forwarding threads — a reader-writer lock fits
/// (spec §5 "Shared resources").
#[derive(Default)]
pub struct FaceTable {
    faces: RwLock<HashMap<FaceId, FaceRecord>>,
}

impl FaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, face: Arc<dyn Face>) {
        let id = face.id();
        self.faces.write().unwrap().insert(id, FaceRecord::new(face));
    }

    pub fn get(&self, id: FaceId) -> Option<Arc<dyn Face>> {
        self.faces.read().unwrap().get(&id).map(|r| r.face.clone())
    }

    /// Sends `bytes` on `id` through that face's link service, fragmenting
    /// if needed (spec §4.1: the pipeline never calls `send_frame`
    /// directly). No-op if the face is unknown — a tombstoned face ID is
    /// simply dropped (spec §9 "Cyclic references").
    pub fn send_packet(&self, id: FaceId, bytes: &[u8]) {
        let faces = self.faces.read().unwrap();
        if let Some(record) = faces.get(&id) {
            if !record.face.is_running() {
                return;
            }
            let mtu = record.face.mtu();
            for frame in record.link_service.encode_outgoing(bytes, mtu, 0) {
                let face = record.face.clone();
                tokio::spawn(async move { face.send_frame(frame).await });
            }
        }
    }

    /// Feeds one arriving link-layer frame through `id`'s NDNLP link
    /// service, returning a fully reassembled wire packet once available.
    /// `sender_key` disambiguates peers sharing one face ID on a
    /// multi-access link. No-op (returns `None`) if the face is unknown.
    pub fn handle_incoming_frame(&self, id: FaceId, sender_key: u64, frame: bytes::Bytes) -> Option<bytes::Bytes> {
        let faces = self.faces.read().unwrap();
        let record = faces.get(&id)?;
        record.face.counters().in_bytes.fetch_add(
            frame.len() as u64,
            std::sync::atomic::Ordering::Relaxed,
        );
        record.link_service.handle_incoming_frame(sender_key, frame)
    }

    /// Removes a face; a PIT entry holding this now-tombstoned ID will
    /// simply find no face on its next send (spec §9 "Cyclic references").
    pub fn remove(&self, id: FaceId) {
        if let Some(record) = self.faces.write().unwrap().remove(&id) {
            record.face.close();
        }
    }

    pub fn list(&self) -> Vec<Arc<dyn Face>> {
        self.faces.read().unwrap().values().map(|r| r.face.clone()).collect()
    }

    pub fn sweep_expired(&self) {
        let expired: Vec<FaceId> = self
            .faces
            .read()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.is_expired())
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.remove(id);
        }
    }

    /// Runs reassembly-buffer GC on every face's link service (spec §4.1:
    /// "buffer garbage-collected after 500 ms") and sweeps on-demand faces
    /// past their idle expiration (spec §3). Callers drive this from a
    /// periodic tick.
    pub fn housekeeping(&self) {
        for record in self.faces.read().unwrap().values() {
            record.link_service.housekeeping();
        }
        self.sweep_expired();
    }
}

/// Read-mostly table bundle, republished wholesale on mutation rather than
/// mutated in place by readers (spec §9 "RCU-style publication"). Swapping
/// the `Arc` is the atomic-pointer-swap the spec describes; the brief
/// exclusive lock only guards the swap itself, never a read.
pub struct TableSet {
    pub fib: RwLock<Arc<Fib>>,
    pub rib: RwLock<Rib>,
    pub strategy_table: RwLock<Arc<StrategyTable>>,
}

impl Default for TableSet {
    fn default() -> Self {
        Self {
            fib: RwLock::new(Arc::new(Fib::new())),
            rib: RwLock::new(Rib::new()),
            strategy_table: RwLock::new(Arc::new(StrategyTable::new())),
        }
    }
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fib_snapshot(&self) -> Arc<Fib> {
        self.fib.read().unwrap().clone()
    }

    pub fn strategy_table_snapshot(&self) -> Arc<StrategyTable> {
        self.strategy_table.read().unwrap().clone()
    }

    /// Recomputes the FIB from the RIB and publishes it atomically
    /// (spec §4.2 RIB: "applies it atomically").
    pub fn republish_fib_from_rib<F: FnOnce(&mut Rib)>(&self, mutate: F) {
        let mut rib = self.rib.write().unwrap();
        mutate(&mut rib);
        let projected = Arc::new(rib.project());
        *self.fib.write().unwrap() = projected;
    }
}

/// Constructed once at startup and threaded through every component —
/// forwarding threads, the management module, face listeners (spec §9).
pub struct ForwarderContext {
    pub faces: Arc<FaceTable>,
    pub tables: Arc<TableSet>,
    pub metrics: Arc<UdcnMetrics>,
    pub cs_policy: CsPolicy,
    face_opener: RwLock<Option<Arc<FaceOpener>>>,
}

impl ForwarderContext {
    pub fn new() -> Self {
        Self {
            faces: Arc::new(FaceTable::new()),
            tables: Arc::new(TableSet::new()),
            metrics: Arc::new(UdcnMetrics::default()),
            cs_policy: CsPolicy::default(),
            face_opener: RwLock::new(None),
        }
    }

    /// Registers the transport's outbound-face callback. Called once at
    /// startup; `faces create` is a 501 until this has been set.
    pub fn set_face_opener(&self, opener: Arc<FaceOpener>) {
        *self.face_opener.write().unwrap() = Some(opener);
    }

    /// Asks the registered transport to open an outbound face to `uri`.
    /// Returns `false` if no transport has registered an opener.
    pub fn open_face(&self, uri: &str, server_name: &str) -> bool {
        match self.face_opener.read().unwrap().clone() {
            Some(opener) => {
                opener(uri.to_string(), server_name.to_string());
                true
            }
            None => false,
        }
    }
}

impl Default for ForwarderContext {
    fn default() -> Self {
        Self::new()
    }
}
