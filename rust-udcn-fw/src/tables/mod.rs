//! FIB, RIB, StrategyTable, PIT and CS (spec §2 item 3, §4.2).

pub mod cs;
pub mod fib;
pub mod pit;
pub mod rib;
pub mod strategy_table;
mod trie;

pub use cs::ContentStore;
pub use fib::Fib;
pub use pit::Pit;
pub use rib::Rib;
pub use strategy_table::StrategyTable;
