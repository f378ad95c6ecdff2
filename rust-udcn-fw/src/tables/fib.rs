//! Forwarding Information Base (spec §3 "FIB entry", §4.2 "FIB").

use super::trie::NameTrie;
use crate::face::FaceId;
use rust_udcn_common::ndn::Name;

/// One (face, cost) nexthop. Ordering is by ascending cost then ascending
/// face_id, matching the FIB entry invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nexthop {
    pub face_id: FaceId,
    pub cost: u32,
}

impl PartialOrd for Nexthop {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Nexthop {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.cost.cmp(&other.cost).then(self.face_id.cmp(&other.face_id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FibEntry {
    pub nexthops: Vec<Nexthop>,
}

impl FibEntry {
    fn sort(&mut self) {
        self.nexthops.sort();
    }

    /// Upsert: replaces the cost if `face_id` already has a nexthop here,
    /// otherwise appends (spec: "no duplicate face_id per entry").
    fn insert_nexthop(&mut self, face_id: FaceId, cost: u32) {
        match self.nexthops.iter_mut().find(|n| n.face_id == face_id) {
            Some(n) => n.cost = cost,
            None => self.nexthops.push(Nexthop { face_id, cost }),
        }
        self.sort();
    }

    fn remove_nexthop(&mut self, face_id: FaceId) {
        self.nexthops.retain(|n| n.face_id != face_id);
    }
}

/// Read-mostly, single-writer structure (spec §4.2: "single-writer
/// (management), many-reader (forwarding threads)"). Callers publish
/// mutations by swapping an `Arc<Fib>` or holding a brief exclusive lock;
/// this type itself does no locking.
#[derive(Default, Clone)]
pub struct Fib {
    trie: NameTrie<FibEntry>,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_nexthop(&mut self, name: &Name, face_id: FaceId, cost: u32) {
        let entry = self.trie.entry(name).get_or_insert_with(FibEntry::default);
        entry.insert_nexthop(face_id, cost);
    }

    pub fn remove_nexthop(&mut self, name: &Name, face_id: FaceId) {
        if let Some(entry) = self.trie.entry(name) {
            entry.remove_nexthop(face_id);
            if entry.nexthops.is_empty() {
                self.trie.remove(name);
            }
        }
    }

    /// Returns the deepest entry whose name is a prefix of `name`
    /// (spec §4.2: `longest_prefix_match`).
    pub fn longest_prefix_match(&self, name: &Name) -> Option<&FibEntry> {
        self.trie.longest_prefix_match(name).map(|(v, _)| v)
    }

    pub fn list(&self) -> Vec<(Name, FibEntry)> {
        self.trie
            .iter_all()
            .into_iter()
            .map(|(n, e)| (n, e.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nexthops_sorted_by_cost_then_face_id() {
        let mut fib = Fib::new();
        let name = Name::from_string("/a");
        fib.insert_nexthop(&name, FaceId(2), 20);
        fib.insert_nexthop(&name, FaceId(1), 10);
        fib.insert_nexthop(&name, FaceId(3), 10);

        let entry = fib.longest_prefix_match(&name).unwrap();
        let ids: Vec<u64> = entry.nexthops.iter().map(|n| n.face_id.0).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn upsert_replaces_existing_face_cost() {
        let mut fib = Fib::new();
        let name = Name::from_string("/a");
        fib.insert_nexthop(&name, FaceId(1), 10);
        fib.insert_nexthop(&name, FaceId(1), 99);
        let entry = fib.longest_prefix_match(&name).unwrap();
        assert_eq!(entry.nexthops.len(), 1);
        assert_eq!(entry.nexthops[0].cost, 99);
    }

    #[test]
    fn longest_prefix_match_deterministic_across_calls() {
        let mut fib = Fib::new();
        fib.insert_nexthop(&Name::from_string("/a"), FaceId(1), 1);
        fib.insert_nexthop(&Name::from_string("/a/b"), FaceId(2), 1);

        let q = Name::from_string("/a/b/c");
        let first = fib.longest_prefix_match(&q).unwrap().nexthops.clone();
        let second = fib.longest_prefix_match(&q).unwrap().nexthops.clone();
        assert_eq!(first, second);
        assert_eq!(first[0].face_id, FaceId(2));
    }
}
