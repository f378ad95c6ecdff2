//! `best-route` strategy (spec §4.3): forwards to the lowest-cost nexthop,
//! escalating through progressively worse nexthops on retransmission, and
//! to every nexthop once retransmissions have run long enough.

use super::StrategyAction;
use crate::face::FaceId;
use crate::tables::fib::Nexthop;
use crate::tables::pit::PitEntry;
use rust_udcn_common::ndn::Interest;
use std::time::{Duration, Instant};

/// Past this elapsed time since the first attempt, best-route gives up on
/// sequential escalation and multicasts to every remaining nexthop (spec
/// scenario 4: "After 200 ms of no Data ... multicast to both"). The
/// scenario's 100 ms "within suppression window" retransmission and this
/// 200 ms ceiling collapse into this single two-tier schedule: first retry
/// moves to the next candidate, anything after that escalates fully.
const ESCALATE_AFTER: Duration = Duration::from_millis(200);

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

    let first_sent = entry.out_records.values().map(|r| r.last_timestamp).min();

    match first_sent {
        None => {
            entry.strategy_info.retransmit_count = 1;
            entry.strategy_info.last_nexthop_tried = Some(candidates[0]);
            vec![StrategyAction::SendInterest {
                face_id: candidates[0],
                nonce: None,
            }]
        }
        Some(t0) if now.duration_since(t0) < ESCALATE_AFTER => {
            let next_index = entry.strategy_info.retransmit_count as usize;
            if next_index < candidates.len() {
                entry.strategy_info.retransmit_count += 1;
                entry.strategy_info.last_nexthop_tried = Some(candidates[next_index]);
                vec![StrategyAction::SendInterest {
                    face_id: candidates[next_index],
                    nonce: None,
                }]
            } else {
                Vec::new()
            }
        }
        Some(_) => candidates
            .into_iter()
            .map(|face_id| StrategyAction::SendInterest { face_id, nonce: None })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::pit::Pit;
    use rust_udcn_common::ndn::Name;

    fn nh(face: u64, cost: u32) -> Nexthop {
        Nexthop {
            face_id: FaceId(face),
            cost,
        }
    }

    #[test]
    fn first_attempt_uses_lowest_cost() {
        let mut pit = Pit::new();
        let name = Name::from_string("/y");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        let entry = pit.get_mut(&name).unwrap();

        let nexthops = vec![nh(1, 10), nh(2, 20)];
        let interest = Interest::new(name.clone());
        let actions = after_receive_interest(entry, FaceId(3), &interest, &nexthops, t0);
        match &actions[0] {
            StrategyAction::SendInterest { face_id, .. } => assert_eq!(*face_id, FaceId(1)),
            _ => panic!("expected SendInterest"),
        }
    }

    #[test]
    fn retransmission_within_window_escalates_to_next_cost() {
        let mut pit = Pit::new();
        let name = Name::from_string("/y");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        pit.insert_out_record(&name, FaceId(1), 1, t0, t0 + Duration::from_secs(4));

        let entry = pit.get_mut(&name).unwrap();
        entry.strategy_info.retransmit_count = 1;
        let nexthops = vec![nh(1, 10), nh(2, 20)];
        let interest = Interest::new(name.clone());
        let actions = after_receive_interest(
            entry,
            FaceId(3),
            &interest,
            &nexthops,
            t0 + Duration::from_millis(50),
        );
        match &actions[0] {
            StrategyAction::SendInterest { face_id, .. } => assert_eq!(*face_id, FaceId(2)),
            _ => panic!("expected SendInterest"),
        }
    }

    #[test]
    fn long_wait_escalates_to_multicast() {
        let mut pit = Pit::new();
        let name = Name::from_string("/y");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        pit.insert_out_record(&name, FaceId(1), 1, t0, t0 + Duration::from_secs(4));

        let entry = pit.get_mut(&name).unwrap();
        let nexthops = vec![nh(1, 10), nh(2, 20)];
        let interest = Interest::new(name.clone());
        let actions = after_receive_interest(
            entry,
            FaceId(3),
            &interest,
            &nexthops,
            t0 + Duration::from_millis(250),
        );
        assert_eq!(actions.len(), 2);
    }
}
