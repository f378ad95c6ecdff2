//! `multicast` strategy (spec §4.3): forwards to every nexthop, suppressing
//! a retransmission with a different nonce while a recent out-record is
//! still live.

use super::StrategyAction;
use crate::face::FaceId;
use crate::tables::fib::Nexthop;
use crate::tables::pit::PitEntry;
use rust_udcn_common::ndn::Interest;
use std::time::{Duration, Instant};

/// Suppression window for a retransmission with a different nonce (spec).
const SUPPRESSION_WINDOW: Duration = Duration::from_millis(500);

pub fn after_receive_interest(
    entry: &mut PitEntry,
    in_face: FaceId,
    interest: &Interest,
    nexthops: &[Nexthop],
    now: Instant,
) -> Vec<StrategyAction> {
    let _ = interest;
    let candidates: Vec<FaceId> = nexthops
        .iter()
        .filter(|n| n.face_id != in_face)
        .map(|n| n.face_id)
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let youngest_out_record = entry.out_records.values().map(|r| r.last_timestamp).max();
    if let Some(t) = youngest_out_record {
        if now.duration_since(t) < SUPPRESSION_WINDOW {
            return Vec::new();
        }
    }

    candidates
        .into_iter()
        .map(|face_id| StrategyAction::SendInterest { face_id, nonce: None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::pit::Pit;
    use rust_udcn_common::ndn::Name;

    fn nh(face: u64) -> Nexthop {
        Nexthop {
            face_id: FaceId(face),
            cost: 1,
        }
    }

    #[test]
    fn first_interest_forwards_to_all_nexthops() {
        let mut pit = Pit::new();
        let name = Name::from_string("/x");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        let entry = pit.get_mut(&name).unwrap();
        let nexthops = vec![nh(1), nh(2), nh(3)];
        let interest = Interest::new(name.clone());
        let actions = after_receive_interest(entry, FaceId(4), &interest, &nexthops, t0);
        assert_eq!(actions.len(), 3);
    }

    #[test]
    fn retransmission_within_window_is_suppressed() {
        let mut pit = Pit::new();
        let name = Name::from_string("/x");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        pit.insert_out_record(&name, FaceId(1), 1, t0, t0 + Duration::from_secs(4));
        pit.insert_out_record(&name, FaceId(2), 1, t0, t0 + Duration::from_secs(4));
        pit.insert_out_record(&name, FaceId(3), 1, t0, t0 + Duration::from_secs(4));

        let entry = pit.get_mut(&name).unwrap();
        let nexthops = vec![nh(1), nh(2), nh(3)];
        let interest = Interest::new(name.clone()).with_nonce(2);
        let actions = after_receive_interest(
            entry,
            FaceId(4),
            &interest,
            &nexthops,
            t0 + Duration::from_millis(200),
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn retransmission_after_window_forwards_to_all() {
        let mut pit = Pit::new();
        let name = Name::from_string("/x");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        pit.insert_out_record(&name, FaceId(1), 1, t0, t0 + Duration::from_secs(4));
        pit.insert_out_record(&name, FaceId(2), 1, t0, t0 + Duration::from_secs(4));
        pit.insert_out_record(&name, FaceId(3), 1, t0, t0 + Duration::from_secs(4));

        let entry = pit.get_mut(&name).unwrap();
        let nexthops = vec![nh(1), nh(2), nh(3)];
        let interest = Interest::new(name.clone()).with_nonce(3);
        let actions = after_receive_interest(
            entry,
            FaceId(4),
            &interest,
            &nexthops,
            t0 + Duration::from_millis(600),
        );
        assert_eq!(actions.len(), 3);
    }
}
