//! Content Store (spec §3 "CS entry", §4.2 "CS").

use rust_udcn_common::ndn::{Data, Interest, Name};
use std::collections::HashMap;
use std::time::Instant;

struct CsEntry {
    data: Data,
    insertion_time: Instant,
    last_access: Instant,
}

/// Bounded, in-memory cache of served Data. `admit`/`serve` independently
/// gate writes and reads (spec). Capacity 0 disables the store entirely.
pub struct ContentStore {
    entries: HashMap<Name, CsEntry>,
    capacity: usize,
    pub admit: bool,
    pub serve: bool,
}

impl ContentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            admit: true,
            serve: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict_to_capacity();
    }

    /// Inserts `data` if `admit` is set and the store is not disabled.
    /// Evicts the least-recently-used entry if over capacity afterward.
    pub fn insert(&mut self, data: Data) {
        if !self.admit || self.capacity == 0 {
            return;
        }
        let now = Instant::now();
        self.entries.insert(
            data.name.clone(),
            CsEntry {
                data,
                insertion_time: now,
                last_access: now,
            },
        );
        self.evict_to_capacity();
    }

    fn evict_to_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let lru_name = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(name, _)| name.clone());
            match lru_name {
                Some(name) => {
                    self.entries.remove(&name);
                }
                None => break,
            }
        }
    }

    /// Returns Data satisfying `interest`, honoring `CanBePrefix` and
    /// `MustBeFresh` (spec). Returns `None` if `serve` is false.
    pub fn find(&mut self, interest: &Interest) -> Option<Data> {
        if !self.serve || self.capacity == 0 {
            return None;
        }

        let mut candidates: Vec<&Name> = self
            .entries
            .iter()
            .filter(|(name, entry)| {
                let name_matches = if interest.can_be_prefix {
                    interest.name.is_prefix_of(name)
                } else {
                    interest.name == **name
                };
                if !name_matches {
                    return false;
                }
                if interest.must_be_fresh {
                    entry.insertion_time.elapsed() <= freshness_period(entry)
                } else {
                    true
                }
            })
            .map(|(name, _)| name)
            .collect();
        candidates.sort();
        let matched = candidates.into_iter().next().cloned()?;

        let entry = self.entries.get_mut(&matched)?;
        entry.last_access = Instant::now();
        Some(entry.data.clone())
    }
}

/// Freshness is measured from `insertion_time`, not the Data's own
/// `creation_time` (spec §4.2) — they diverge whenever Data was built or
/// decoded before it entered the store.
fn freshness_period(entry: &CsEntry) -> std::time::Duration {
    std::time::Duration::from_millis(entry.data.ttl_ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn capacity_never_exceeded() {
        let mut cs = ContentStore::new(2);
        cs.insert(Data::new(Name::from_string("/a"), "1"));
        cs.insert(Data::new(Name::from_string("/b"), "2"));
        cs.insert(Data::new(Name::from_string("/c"), "3"));
        assert_eq!(cs.len(), 2);
    }

    #[test]
    fn must_be_fresh_respects_freshness_period() {
        let mut cs = ContentStore::new(10);
        cs.insert(Data::new(Name::from_string("/a/b"), "x").with_ttl(50));

        let mut fresh_interest = Interest::new(Name::from_string("/a/b"));
        fresh_interest.must_be_fresh = true;
        assert!(cs.find(&fresh_interest).is_some());

        sleep(Duration::from_millis(80));
        assert!(cs.find(&fresh_interest).is_none());
    }

    #[test]
    fn can_be_prefix_matches_descendant_names() {
        let mut cs = ContentStore::new(10);
        cs.insert(Data::new(Name::from_string("/a/b"), "x").with_ttl(10_000));

        let mut interest = Interest::new(Name::from_string("/a"));
        interest.can_be_prefix = true;
        interest.must_be_fresh = false;
        assert!(cs.find(&interest).is_some());
    }

    #[test]
    fn capacity_zero_disables_store() {
        let mut cs = ContentStore::new(0);
        cs.insert(Data::new(Name::from_string("/a"), "x"));
        assert_eq!(cs.len(), 0);
    }
}
