//! Routing Information Base (spec §3 "RIB entry", §4.2 "RIB").
//!
//! The RIB is the authoritative administrative route store; the FIB is a
//! read-mostly projection of it. Mutations here trigger a full FIB
//! recomputation rather than an incremental per-name delta — simpler to
//! reason about, and correct, at the cost of O(registrations × depth) per
//! mutation instead of O(affected names).

use super::fib::Fib;
use super::trie::NameTrie;
use crate::face::FaceId;
use rust_udcn_common::ndn::Name;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteFlags {
    /// Whether this route is inherited by FIB entries for descendant
    /// names. Registrations default this on; an explicit unset is
    /// expressed by constructing with `child_inherit: false`.
    pub child_inherit: bool,
    /// Blocks inheritance of routes registered at ancestors of this name
    /// from reaching descendants of this name.
    pub capture: bool,
}

impl RouteFlags {
    pub fn inherited() -> Self {
        Self {
            child_inherit: true,
            capture: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RibRoute {
    pub face_id: FaceId,
    pub origin: String,
    pub cost: u32,
    pub flags: RouteFlags,
    pub expiration: Option<Instant>,
}

#[derive(Default)]
pub struct Rib {
    trie: NameTrie<Vec<RibRoute>>,
}

impl Rib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route; multiple routes with distinct (face_id, origin)
    /// coexist (spec). Re-registering the same (face_id, origin) replaces
    /// it.
    pub fn register(&mut self, name: &Name, route: RibRoute) {
        let entry = self.trie.entry(name).get_or_insert_with(Vec::new);
        entry.retain(|r| !(r.face_id == route.face_id && r.origin == route.origin));
        entry.push(route);
    }

    pub fn unregister(&mut self, name: &Name, face_id: FaceId, origin: &str) {
        if let Some(routes) = self.trie.entry(name) {
            routes.retain(|r| !(r.face_id == face_id && r.origin == origin));
        }
    }

    pub fn list(&self) -> Vec<(Name, Vec<RibRoute>)> {
        self.trie
            .iter_all()
            .into_iter()
            .map(|(n, r)| (n, r.clone()))
            .collect()
    }

    /// Projects the RIB into a fresh FIB, honoring `ChildInherit`/`Capture`
    /// (spec §3 "RIB→FIB projection").
    pub fn project(&self) -> Fib {
        let mut fib = Fib::new();
        for (name, routes) in self.trie.iter_all() {
            let mut merged: HashMap<FaceId, u32> = HashMap::new();
            for r in routes {
                merge_min(&mut merged, r.face_id, r.cost);
            }

            let mut blocked = routes.iter().any(|r| r.flags.capture);
            let mut depth = name.len();
            while depth > 0 && !blocked {
                depth -= 1;
                let ancestor = name.prefix(depth);
                if let Some(anc_routes) = self.trie.get(&ancestor) {
                    for r in anc_routes {
                        if r.flags.child_inherit {
                            merge_min(&mut merged, r.face_id, r.cost);
                        }
                    }
                    if anc_routes.iter().any(|r| r.flags.capture) {
                        blocked = true;
                    }
                }
            }

            for (face_id, cost) in merged {
                fib.insert_nexthop(&name, face_id, cost);
            }
        }
        fib
    }
}

fn merge_min(map: &mut HashMap<FaceId, u32>, face_id: FaceId, cost: u32) {
    map.entry(face_id)
        .and_modify(|c| *c = (*c).min(cost))
        .or_insert(cost);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(face: u64, cost: u32, flags: RouteFlags) -> RibRoute {
        RibRoute {
            face_id: FaceId(face),
            origin: "static".to_string(),
            cost,
            flags,
            expiration: None,
        }
    }

    #[test]
    fn child_inherit_projects_to_descendants() {
        let mut rib = Rib::new();
        rib.register(&Name::from_string("/a"), route(1, 5, RouteFlags::inherited()));

        let fib = rib.project();
        let entry = fib.longest_prefix_match(&Name::from_string("/a/b/c")).unwrap();
        assert_eq!(entry.nexthops.len(), 1);
        assert_eq!(entry.nexthops[0].face_id, FaceId(1));
        assert_eq!(entry.nexthops[0].cost, 5);
    }

    #[test]
    fn capture_blocks_ancestor_inheritance() {
        let mut rib = Rib::new();
        rib.register(&Name::from_string("/a"), route(1, 5, RouteFlags::inherited()));
        rib.register(
            &Name::from_string("/a/b"),
            route(2, 3, RouteFlags::inherited()),
        );

        let fib = rib.project();
        let entry = fib.longest_prefix_match(&Name::from_string("/a/b/c")).unwrap();
        let mut ids: Vec<u64> = entry.nexthops.iter().map(|n| n.face_id.0).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);

        rib.register(
            &Name::from_string("/a/b"),
            RibRoute {
                flags: RouteFlags {
                    child_inherit: true,
                    capture: true,
                },
                ..route(2, 3, RouteFlags::inherited())
            },
        );

        let fib = rib.project();
        let entry = fib.longest_prefix_match(&Name::from_string("/a/b/c")).unwrap();
        assert_eq!(entry.nexthops.len(), 1);
        assert_eq!(entry.nexthops[0].face_id, FaceId(2));
    }
}
