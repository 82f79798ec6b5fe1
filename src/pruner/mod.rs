//! Stale-tree pruner: age predicate, per-file action policy, and the recursive
//! walker that applies them.

pub mod age;
pub mod policy;
pub mod report;
pub mod walker;
