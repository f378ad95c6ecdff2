//! Pending Interest Table (spec §3 "PIT entry", §4.2 "PIT").
//!
//! One `Pit` instance is owned by a single forwarding thread and holds only
//! the shard of names that hash to it (spec §5 "Sharding key"); this type
//! itself is unaware of sharding; the pipeline picks which shard's `Pit` to
//! call.

use crate::face::FaceId;
use rust_udcn_common::ndn::Name;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default dead-nonce window (spec §9 Open Questions: "implementers should
/// choose a default ≥ 6 s and make it configurable").
pub const DEFAULT_DEAD_NONCE_WINDOW: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy)]
pub struct InRecord {
    pub last_nonce: u32,
    pub last_expiry: Instant,
    pub last_hop_limit: Option<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct OutRecord {
    pub last_nonce: u32,
    pub last_timestamp: Instant,
    pub last_expiry: Instant,
}

/// Per-strategy scratch space living on the PIT entry (spec §4.3:
/// "Strategies MUST be purely a function of inputs and table state; any
/// per-strategy memory lives in the PIT entry's strategy-info slot").
#[derive(Debug, Clone, Default)]
pub struct StrategyInfo {
    pub retransmit_count: u32,
    pub last_nexthop_tried: Option<FaceId>,
}

pub struct PitEntry {
    pub name: Name,
    pub in_records: HashMap<FaceId, InRecord>,
    pub out_records: HashMap<FaceId, OutRecord>,
    pub strategy_info: StrategyInfo,
}

impl PitEntry {
    fn new(name: Name) -> Self {
        Self {
            name,
            in_records: HashMap::new(),
            out_records: HashMap::new(),
            strategy_info: StrategyInfo::default(),
        }
    }

    /// Expiry of this entry is `max(in-records.last_expiry)` (spec).
    pub fn expiry(&self) -> Option<Instant> {
        self.in_records.values().map(|r| r.last_expiry).max()
    }

    pub fn is_alive(&self, now: Instant) -> bool {
        match self.expiry() {
            Some(exp) => exp > now,
            None => false,
        }
    }
}

pub struct Pit {
    entries: HashMap<Name, PitEntry>,
    /// Nonces seen per name within the dead-nonce window, independent of
    /// whether the PIT entry itself still exists — duplicate suppression
    /// must outlive entry erasure (spec: loop-suppression scenario).
    dead_nonces: HashMap<(Name, u32), Instant>,
    dead_nonce_window: Duration,
}

impl Default for Pit {
    fn default() -> Self {
        Self::with_dead_nonce_window(DEFAULT_DEAD_NONCE_WINDOW)
    }
}

impl Pit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dead_nonce_window(window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            dead_nonces: HashMap::new(),
            dead_nonce_window: window,
        }
    }

    fn is_duplicate_nonce(&self, name: &Name, nonce: u32, now: Instant) -> bool {
        match self.dead_nonces.get(&(name.clone(), nonce)) {
            Some(seen_at) => now.duration_since(*seen_at) < self.dead_nonce_window,
            None => false,
        }
    }

    /// Returns `(is_new_entry, is_duplicate_nonce)`. On a non-duplicate
    /// nonce, records it and upserts/creates the entry; callers look the
    /// entry back up via [`Pit::get_mut`] to avoid fighting the borrow
    /// checker over the returned reference while also touching
    /// `dead_nonces`.
    pub fn find_or_insert(&mut self, name: &Name, nonce: u32, now: Instant) -> (bool, bool) {
        if self.is_duplicate_nonce(name, nonce, now) {
            return (false, true);
        }
        self.dead_nonces.insert((name.clone(), nonce), now);
        let is_new = !self.entries.contains_key(name);
        self.entries
            .entry(name.clone())
            .or_insert_with(|| PitEntry::new(name.clone()));
        (is_new, false)
    }

    pub fn get_mut(&mut self, name: &Name) -> Option<&mut PitEntry> {
        self.entries.get_mut(name)
    }

    pub fn get(&self, name: &Name) -> Option<&PitEntry> {
        self.entries.get(name)
    }

    pub fn insert_in_record(&mut self, name: &Name, face_id: FaceId, nonce: u32, expiry: Instant, hop_limit: Option<u8>) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.in_records.insert(
                face_id,
                InRecord {
                    last_nonce: nonce,
                    last_expiry: expiry,
                    last_hop_limit: hop_limit,
                },
            );
        }
    }

    pub fn insert_out_record(&mut self, name: &Name, face_id: FaceId, nonce: u32, now: Instant, expiry: Instant) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.out_records.insert(
                face_id,
                OutRecord {
                    last_nonce: nonce,
                    last_timestamp: now,
                    last_expiry: expiry,
                },
            );
        }
    }

    pub fn erase(&mut self, name: &Name) -> Option<PitEntry> {
        self.entries.remove(name)
    }

    /// All PIT entries whose name is a prefix of `data_name` (spec §4.3
    /// Incoming Data pipeline step 1), deepest match last is irrelevant —
    /// every matching ancestor entry is returned; a strategy satisfies all
    /// of them.
    pub fn matches_for_data(&self, data_name: &Name) -> Vec<&Name> {
        self.entries
            .keys()
            .filter(|name| name.is_prefix_of(data_name))
            .collect()
    }

    /// Entries whose last in-record has expired as of `now`, without
    /// removing them — the pipeline finalizes and then erases.
    pub fn expired_entries(&self, now: Instant) -> Vec<Name> {
        self.entries
            .values()
            .filter(|e| !e.is_alive(now))
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn garbage_collect_dead_nonces(&mut self, now: Instant) {
        let window = self.dead_nonce_window;
        self.dead_nonces.retain(|_, seen_at| now.duration_since(*seen_at) < window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_nonce_suppressed_within_window() {
        let mut pit = Pit::new();
        let name = Name::from_string("/a");
        let t0 = Instant::now();

        let (is_new, dup) = pit.find_or_insert(&name, 7, t0);
        assert!(is_new);
        assert!(!dup);

        let (_, dup) = pit.find_or_insert(&name, 7, t0 + Duration::from_secs(1));
        assert!(dup);
    }

    #[test]
    fn duplicate_detection_survives_entry_erasure() {
        let mut pit = Pit::new();
        let name = Name::from_string("/a");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 7, t0);
        pit.erase(&name);

        let (_, dup) = pit.find_or_insert(&name, 7, t0 + Duration::from_secs(2));
        assert!(dup);
    }

    #[test]
    fn nonce_usable_again_after_window_expires() {
        let mut pit = Pit::with_dead_nonce_window(Duration::from_millis(10));
        let name = Name::from_string("/a");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 7, t0);

        let (is_new, dup) = pit.find_or_insert(&name, 7, t0 + Duration::from_millis(20));
        assert!(!dup);
        assert!(is_new);
    }

    #[test]
    fn entry_erased_after_last_in_record_expires() {
        let mut pit = Pit::new();
        let name = Name::from_string("/a");
        let t0 = Instant::now();
        pit.find_or_insert(&name, 1, t0);
        pit.insert_in_record(&name, FaceId(1), 1, t0 + Duration::from_millis(100), None);

        assert!(pit.expired_entries(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(pit.expired_entries(t0 + Duration::from_millis(150)), vec![name]);
    }
}
