//! Pluggable forwarding strategies (spec §2 item 4, §4.3 "Strategies",
//! §9 "Strategy plugins").
//!
//! A strategy is a tagged variant of a known, compile-time-registered
//! implementation — not a trait object behind `dyn` — so the registry
//! keyed by `(name, version)` stays exhaustive and new strategies are added
//! by extending the `Strategy` enum rather than by runtime plugin loading.

pub mod best_route;
pub mod multicast;

use crate::face::FaceId;
use crate::tables::fib::Nexthop;
use crate::tables::pit::PitEntry;
use rust_udcn_common::ndn::{Data, Interest};
use std::time::Instant;

/// What a strategy wants the pipeline to do, decoupled from actually
/// touching a face so strategies stay pure functions of their inputs (spec
/// §4.3: "Strategies MUST be purely a function of inputs and table
/// state").
#[derive(Debug, Clone)]
pub enum StrategyAction {
    SendInterest { face_id: FaceId, nonce: Option<u32> },
    SendData { face_id: FaceId },
    None,
}

/// Compile-time-registered forwarding strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BestRoute,
    Multicast,
}

impl Strategy {
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "best-route" => Some(Strategy::BestRoute),
            "multicast" => Some(Strategy::Multicast),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::BestRoute => "best-route",
            Strategy::Multicast => "multicast",
        }
    }

    /// Registered versions for this strategy; used by the `strategy-choice`
    /// management verb to reject unknown versions (404).
    pub fn known_versions(&self) -> &'static [u32] {
        &[1]
    }

    pub fn after_receive_interest(
        &self,
        entry: &mut PitEntry,
        in_face: FaceId,
        interest: &Interest,
        nexthops: &[Nexthop],
        now: Instant,
    ) -> Vec<StrategyAction> {
        match self {
            Strategy::BestRoute => best_route::after_receive_interest(entry, in_face, interest, nexthops, now),
            Strategy::Multicast => multicast::after_receive_interest(entry, in_face, interest, nexthops, now),
        }
    }

    pub fn after_content_store_hit(&self, entry: &mut PitEntry, in_face: FaceId, data: &Data) -> Vec<StrategyAction> {
        let _ = (entry, data);
        vec![StrategyAction::SendData { face_id: in_face }]
    }

    /// Called once per matched PIT in-record before satisfying it; both
    /// strategies here have no extra bookkeeping to do, but the hook
    /// exists so future strategies (e.g. ones tracking RTT) have
    /// somewhere to update their PIT strategy-info slot.
    pub fn before_satisfy_interest(&self, entry: &mut PitEntry, in_face: FaceId) {
        let _ = (entry, in_face);
    }

    pub fn after_receive_data(&self, entry: &mut PitEntry, in_face: FaceId, data: &Data) -> Vec<StrategyAction> {
        let _ = data;
        entry
            .in_records
            .keys()
            .filter(|&&face| face != in_face)
            .map(|&face_id| StrategyAction::SendData { face_id })
            .collect()
    }
}
