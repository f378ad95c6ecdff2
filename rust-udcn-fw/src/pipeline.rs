//! Forwarding pipelines (spec §4.3): Incoming Interest, Outgoing Interest,
//! Incoming Data, and Interest finalization.
//!
//! One [`ForwardingThread`] owns a single shard of the PIT and CS — sharded
//! by name hash across however many threads the process runs (spec §5
//! "Sharding key") — plus a shared handle to the [`ForwarderContext`]. A
//! thread drains its inbound queue and runs each item through the
//! appropriate pipeline to completion before picking up the next; pipelines
//! never block on I/O, only enqueue work for the link service.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

use rust_udcn_common::ndn::{Data, Interest, Name};

use crate::context::ForwarderContext;
use crate::face::{FaceId, LinkKind};
use crate::management::{self, ControlParameters};
use crate::packet::{InboundItem, Packet, PacketVariant};
use crate::strategy::{Strategy, StrategyAction};
use crate::tables::cs::ContentStore;
use crate::tables::pit::Pit;

/// Prefix under which management Interests are recognized (spec §4.4).
/// Matched structurally so `/localhost/nfd/fib/list` and
/// `/localhost/nfd/fib/list/<params>` both resolve.
fn management_prefix() -> Name {
    Name::from_string("/localhost/nfd")
}

/// How often a thread walks its PIT shard for expired entries (spec §4.3
/// "Interest finalization").
const FINALIZE_TICK: Duration = Duration::from_millis(100);

/// A single forwarding thread's private table shard plus a handle to the
/// process-wide context (spec §9 "Encapsulate as an explicit context
/// object ... avoid ambient globals" — only the FIB/RIB/StrategyTable and
/// face table are shared; PIT and CS are thread-local shards).
pub struct ForwardingThread {
    id: usize,
    pit: Pit,
    cs: ContentStore,
    ctx: Arc<ForwarderContext>,
}

impl ForwardingThread {
    pub fn new(id: usize, cs_capacity: usize, ctx: Arc<ForwarderContext>) -> Self {
        Self {
            id,
            pit: Pit::new(),
            cs: ContentStore::new(cs_capacity),
            ctx,
        }
    }

    /// Applies the `tables.cs.admit`/`tables.cs.serve` config knobs (spec
    /// §6) to this shard's Content Store at startup.
    pub fn with_cs_policy(mut self, admit: bool, serve: bool) -> Self {
        self.cs.admit = admit;
        self.cs.serve = serve;
        self
    }

    /// Applies the `fw.dead_nonce_window_ms` config knob (spec §9 Open
    /// Questions) to this shard's PIT.
    pub fn with_dead_nonce_window(mut self, window: Duration) -> Self {
        self.pit = Pit::with_dead_nonce_window(window);
        self
    }

    /// Drains `inbound` until the channel closes, interleaving packet
    /// processing with periodic PIT finalization.
    pub async fn run(&mut self, mut inbound: mpsc::Receiver<InboundItem>) {
        let mut tick = interval(FINALIZE_TICK);
        loop {
            tokio::select! {
                item = inbound.recv() => {
                    match item {
                        Some(item) => self.handle(item),
                        None => break,
                    }
                }
                _ = tick.tick() => {
                    self.finalize_expired(Instant::now());
                }
            }
        }
    }

    fn handle(&mut self, item: InboundItem) {
        let InboundItem { packet, in_face_id } = item;
        match packet.variant {
            PacketVariant::Interest(interest) => {
                self.handle_incoming_interest(interest, in_face_id);
            }
            PacketVariant::Data(data) => {
                self.handle_incoming_data(data, in_face_id);
            }
        }
    }

    /// Incoming Interest pipeline (spec §4.3 step 1).
    fn handle_incoming_interest(&mut self, mut interest: Interest, in_face: FaceId) {
        self.ctx.metrics.interests_received.increment();

        let prefix = management_prefix();
        if prefix.is_prefix_of(&interest.name) {
            self.handle_management_interest(&interest, in_face);
            return;
        }

        if !interest.decrement_hop_limit() {
            debug!("dropping interest {} on thread {}: hop limit exhausted", interest.name, self.id);
            self.ctx.metrics.malformed_drops.increment();
            return;
        }

        let now = Instant::now();
        let expiry = now + Duration::from_millis(interest.lifetime_ms as u64);
        let (_is_new, is_duplicate) = self.pit.find_or_insert(&interest.name, interest.nonce, now);
        if is_duplicate {
            trace!("suppressing looped interest {} nonce {}", interest.name, interest.nonce);
            self.ctx.metrics.loop_suppressed.increment();
            return;
        }
        self.pit
            .insert_in_record(&interest.name, in_face, interest.nonce, expiry, interest.hop_limit);
        self.ctx.metrics.pit_inserts.increment();

        if let Some(data) = self.cs.find(&interest) {
            self.ctx.metrics.cs_hits.increment();
            let strategy = self.resolve_strategy(&interest.name);
            let entry = self.pit.get_mut(&interest.name).expect("just inserted");
            let actions = strategy.after_content_store_hit(entry, in_face, &data);
            self.dispatch_data_actions(&actions, &data);
            self.pit.erase(&interest.name);
            return;
        }
        self.ctx.metrics.cs_misses.increment();

        let strategy = self.resolve_strategy(&interest.name);
        let nexthops = self
            .ctx
            .tables
            .fib_snapshot()
            .longest_prefix_match(&interest.name)
            .map(|e| e.nexthops.clone())
            .unwrap_or_default();

        if nexthops.is_empty() {
            trace!("no FIB route for {}", interest.name);
            return;
        }

        let entry = self.pit.get_mut(&interest.name).expect("just inserted");
        let actions = strategy.after_receive_interest(entry, in_face, &interest, &nexthops, now);
        self.dispatch_interest_actions(&interest, in_face, &actions, now, expiry);
    }

    /// Dispatches a `/localhost/nfd/...` Interest to the management module
    /// (spec §4.4) and replies with a Data carrying the encoded
    /// `ControlResponse`, bypassing PIT/FIB/strategy entirely — management
    /// exchanges are request/response, not forwarded.
    fn handle_management_interest(&mut self, interest: &Interest, in_face: FaceId) {
        let scope = self
            .ctx
            .faces
            .get(in_face)
            .map(|f| f.scope())
            .unwrap_or(crate::face::Scope::NonLocal);

        let prefix_len = management_prefix().len();
        let verb_path: Vec<String> = interest
            .name
            .components()
            .skip(prefix_len)
            .map(|c| c.to_string())
            .collect();
        let params: ControlParameters = interest
            .application_parameters
            .as_ref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
            .unwrap_or_default();

        let response = match management::dispatch(self.ctx.as_ref(), scope, &verb_path, &params) {
            Ok(resp) => resp,
            Err(_) => {
                self.ctx.metrics.malformed_drops.increment();
                return;
            }
        };

        let body = match serde_json::to_vec(&response) {
            Ok(b) => b,
            Err(_) => return,
        };
        let data = Data::new(interest.name.clone(), body).with_ttl(0);
        self.ctx.metrics.data_sent.increment();
        match data.encode() {
            Ok(wire) => self.ctx.faces.send_packet(in_face, &wire),
            Err(e) => warn!("failed to encode management response: {e}"),
        }
    }

    /// Outgoing Interest pipeline (spec §4.3 step 2): refuses to send back
    /// out the face an Interest arrived on, unless that face is an ad-hoc
    /// multi-access link where the peer at the other end may differ from
    /// the one that sent it.
    fn dispatch_interest_actions(
        &mut self,
        interest: &Interest,
        in_face: FaceId,
        actions: &[StrategyAction],
        now: Instant,
        expiry: Instant,
    ) {
        for action in actions {
            if let StrategyAction::SendInterest { face_id, nonce } = action {
                if *face_id == in_face && !self.is_ad_hoc(*face_id) {
                    continue;
                }
                let mut out = interest.clone();
                if let Some(n) = nonce {
                    out.nonce = *n;
                }
                self.pit
                    .insert_out_record(&interest.name, *face_id, out.nonce, now, expiry);
                self.ctx.metrics.interests_sent.increment();
                match out.encode() {
                    Ok(wire) => self.ctx.faces.send_packet(*face_id, &wire),
                    Err(e) => warn!("failed to encode outgoing interest: {e}"),
                }
            }
        }
    }

    /// Incoming Data pipeline (spec §4.3 step 3).
    fn handle_incoming_data(&mut self, data: Data, in_face: FaceId) {
        self.ctx.metrics.data_received.increment();

        let matched: Vec<_> = self.pit.matches_for_data(&data.name).into_iter().cloned().collect();
        if matched.is_empty() {
            trace!("unsolicited data {}", data.name);
            self.ctx.metrics.unsolicited_data_drops.increment();
            return;
        }

        for name in &matched {
            let strategy = self.resolve_strategy(name);
            let entry = match self.pit.get_mut(name) {
                Some(e) => e,
                None => continue,
            };
            let in_faces: Vec<FaceId> = entry.in_records.keys().copied().collect();
            for face in in_faces {
                strategy.before_satisfy_interest(entry, face);
            }
            let actions = strategy.after_receive_data(entry, in_face, &data);
            self.dispatch_data_actions(&actions, &data);
            self.ctx.metrics.interests_satisfied.increment();
        }

        self.cs.insert(data);
        self.ctx.metrics.cs_inserts.increment();

        for name in &matched {
            self.pit.erase(name);
        }
    }

    fn dispatch_data_actions(&mut self, actions: &[StrategyAction], data: &Data) {
        for action in actions {
            if let StrategyAction::SendData { face_id } = action {
                self.ctx.metrics.data_sent.increment();
                match data.encode() {
                    Ok(wire) => self.ctx.faces.send_packet(*face_id, &wire),
                    Err(e) => warn!("failed to encode outgoing data: {e}"),
                }
            }
        }
    }

    /// Interest finalization (spec §4.3 step 4): PIT entries whose last
    /// in-record has expired unsatisfied are counted as timeouts and erased.
    /// Also where this shard's Content Store picks up live `cs config`
    /// changes (spec §4.4) from the shared context.
    fn finalize_expired(&mut self, now: Instant) {
        let cs_policy = self.ctx.cs_policy.get();
        self.cs.admit = cs_policy.admit;
        self.cs.serve = cs_policy.serve;
        if self.cs.capacity() != cs_policy.capacity {
            self.cs.set_capacity(cs_policy.capacity);
        }

        for name in self.pit.expired_entries(now) {
            self.pit.erase(&name);
            self.ctx.metrics.pit_expirations.increment();
            self.ctx.metrics.interests_timed_out.increment();
        }
        self.pit.garbage_collect_dead_nonces(now);
        self.ctx.metrics.pit_size.set(self.pit.len() as u64);
        self.ctx.metrics.cs_size.set(self.cs.len() as u64);
    }

    fn resolve_strategy(&self, name: &rust_udcn_common::ndn::Name) -> Strategy {
        let choice = self.ctx.tables.strategy_table_snapshot();
        let choice = choice.resolve(name);
        Strategy::by_name(&choice.strategy_name).unwrap_or(Strategy::BestRoute)
    }

    fn is_ad_hoc(&self, face_id: FaceId) -> bool {
        self.ctx
            .faces
            .get(face_id)
            .map(|f| f.link_kind() == LinkKind::AdHoc)
            .unwrap_or(false)
    }
}

/// Builds one [`Packet`] from decoded wire bytes, used by a face's read
/// loop before handing work to a forwarding thread's queue.
pub fn decode_inbound(wire: bytes::Bytes, in_face: FaceId) -> Option<Packet> {
    if let Ok(interest) = Interest::decode(&wire) {
        return Some(Packet::new_interest(interest, wire, in_face));
    }
    if let Ok(data) = Data::decode(&wire) {
        return Some(Packet::new_data(data, wire, in_face));
    }
    None
}

/// Picks the forwarding thread that owns `name`'s PIT/CS shard (spec §5
/// "Sharding key"). Deterministic and stateless so every face's read loop
/// can compute it independently without consulting a shared router.
pub fn shard_for(name: &Name, thread_count: usize) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    (hasher.finish() as usize) % thread_count.max(1)
}

/// Dispatches `item` to the shard queue matching its name, dropping it if
/// that shard's thread has gone away.
pub async fn route(senders: &[mpsc::Sender<InboundItem>], item: InboundItem) {
    let shard = shard_for(item.packet.name(), senders.len());
    if let Some(sender) = senders.get(shard) {
        let _ = sender.send(item).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::fib::Fib;
    use rust_udcn_common::ndn::Name;

    fn ctx_with_fib(name: &Name, face: u64) -> Arc<ForwarderContext> {
        let ctx = ForwarderContext::new();
        let mut fib = Fib::new();
        fib.insert_nexthop(name, FaceId(face), 10);
        *ctx.tables.fib.write().unwrap() = Arc::new(fib);
        Arc::new(ctx)
    }

    #[test]
    fn cs_hit_satisfies_without_touching_fib() {
        let name = Name::from_string("/a");
        let ctx = ctx_with_fib(&name, 99);
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());
        thread.cs.insert(Data::new(name.clone(), "payload").with_ttl(10_000));

        let interest = Interest::new(name.clone()).with_must_be_fresh(true);
        thread.handle_incoming_interest(interest, FaceId(1));

        assert_eq!(ctx.metrics.cs_hits.value(), 1);
        assert!(thread.pit.get(&name).is_none());
    }

    #[test]
    fn interest_without_fib_route_is_dropped_silently() {
        let name = Name::from_string("/no/route");
        let ctx = Arc::new(ForwarderContext::new());
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());
        thread.handle_incoming_interest(Interest::new(name.clone()), FaceId(1));
        assert!(thread.pit.get(&name).is_some());
        assert_eq!(ctx.metrics.interests_sent.value(), 0);
    }

    #[test]
    fn data_with_no_pending_interest_is_unsolicited() {
        let ctx = Arc::new(ForwarderContext::new());
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());
        thread.handle_incoming_data(Data::new(Name::from_string("/x"), "y"), FaceId(1));
        assert_eq!(ctx.metrics.unsolicited_data_drops.value(), 1);
    }

    struct DummyFace {
        id: FaceId,
        scope: crate::face::Scope,
    }

    #[async_trait::async_trait]
    impl crate::face::Face for DummyFace {
        fn id(&self) -> FaceId {
            self.id
        }
        fn remote_uri(&self) -> &str {
            "null://"
        }
        fn local_uri(&self) -> &str {
            "null://"
        }
        fn scope(&self) -> crate::face::Scope {
            self.scope
        }
        fn link_kind(&self) -> LinkKind {
            LinkKind::PointToPoint
        }
        fn persistency(&self) -> crate::face::Persistency {
            crate::face::Persistency::Persistent
        }
        fn mtu(&self) -> usize {
            1400
        }
        fn is_running(&self) -> bool {
            true
        }
        fn counters(&self) -> &crate::face::FaceCounters {
            unimplemented!()
        }
        async fn send_frame(&self, _frame: bytes::Bytes) {}
        fn close(&self) {}
    }

    #[test]
    fn management_interest_from_local_face_replies_without_touching_pit() {
        let ctx = Arc::new(ForwarderContext::new());
        ctx.faces.insert(Arc::new(DummyFace {
            id: FaceId(1),
            scope: crate::face::Scope::Local,
        }));
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());

        let interest = Interest::new(Name::from_string("/localhost/nfd/status/general"));
        thread.handle_incoming_interest(interest, FaceId(1));

        assert_eq!(ctx.metrics.data_sent.value(), 1);
        assert!(thread.pit.is_empty());
    }

    #[test]
    fn management_interest_from_non_local_face_is_rejected() {
        let ctx = Arc::new(ForwarderContext::new());
        ctx.faces.insert(Arc::new(DummyFace {
            id: FaceId(1),
            scope: crate::face::Scope::NonLocal,
        }));
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());

        let interest = Interest::new(Name::from_string("/localhost/nfd/status/general"));
        thread.handle_incoming_interest(interest, FaceId(1));

        assert_eq!(ctx.metrics.data_sent.value(), 0);
        assert_eq!(ctx.metrics.malformed_drops.value(), 1);
    }

    #[test]
    fn finalize_expired_picks_up_live_cs_policy() {
        let ctx = Arc::new(ForwarderContext::new());
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());
        ctx.cs_policy.apply(Some(false), Some(false), Some(4));

        thread.finalize_expired(Instant::now());

        assert!(!thread.cs.admit);
        assert!(!thread.cs.serve);
        assert_eq!(thread.cs.capacity(), 4);
    }

    #[test]
    fn finalize_expired_counts_timeout_and_erases() {
        let ctx = Arc::new(ForwarderContext::new());
        let mut thread = ForwardingThread::new(0, 16, ctx.clone());
        let name = Name::from_string("/a");
        let t0 = Instant::now();
        thread.pit.find_or_insert(&name, 1, t0);
        thread
            .pit
            .insert_in_record(&name, FaceId(1), 1, t0 + Duration::from_millis(10), None);

        thread.finalize_expired(t0 + Duration::from_millis(50));
        assert_eq!(ctx.metrics.interests_timed_out.value(), 1);
        assert!(thread.pit.get(&name).is_none());
    }
}
