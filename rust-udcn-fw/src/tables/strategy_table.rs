//! Strategy choice table (spec §3 "Strategy choice entry", §4.2
//! "Strategy Table").

use super::trie::NameTrie;
use rust_udcn_common::ndn::Name;

pub const DEFAULT_STRATEGY: &str = "best-route";
pub const DEFAULT_STRATEGY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyChoice {
    pub strategy_name: String,
    pub strategy_version: u32,
}

/// Longest-prefix-match table over strategy identifiers. Always has a
/// default entry at `/` (spec: "guarantees a default entry at `/`").
#[derive(Clone)]
pub struct StrategyTable {
    trie: NameTrie<StrategyChoice>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let mut trie = NameTrie::new();
        trie.insert(
            &Name::new(),
            StrategyChoice {
                strategy_name: DEFAULT_STRATEGY.to_string(),
                strategy_version: DEFAULT_STRATEGY_VERSION,
            },
        );
        Self { trie }
    }
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &Name, strategy_name: String, strategy_version: u32) {
        self.trie.insert(
            name,
            StrategyChoice {
                strategy_name,
                strategy_version,
            },
        );
    }

    /// Unsetting the root entry is refused by the management module before
    /// this is called; here we simply restore the default if it somehow is.
    pub fn unset(&mut self, name: &Name) {
        if name.is_empty() {
            *self = Self::default();
        } else {
            self.trie.remove(name);
        }
    }

    pub fn resolve(&self, name: &Name) -> &StrategyChoice {
        self.trie
            .longest_prefix_match(name)
            .map(|(v, _)| v)
            .expect("root strategy entry always present")
    }

    pub fn list(&self) -> Vec<(Name, StrategyChoice)> {
        self.trie
            .iter_all()
            .into_iter()
            .map(|(n, s)| (n, s.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_covers_root() {
        let table = StrategyTable::new();
        let choice = table.resolve(&Name::from_string("/anything/at/all"));
        assert_eq!(choice.strategy_name, DEFAULT_STRATEGY);
    }

    #[test]
    fn more_specific_entry_overrides_default() {
        let mut table = StrategyTable::new();
        table.set(&Name::from_string("/multicast-zone"), "multicast".to_string(), 1);
        let choice = table.resolve(&Name::from_string("/multicast-zone/x"));
        assert_eq!(choice.strategy_name, "multicast");
        let other = table.resolve(&Name::from_string("/elsewhere"));
        assert_eq!(other.strategy_name, DEFAULT_STRATEGY);
    }
}
