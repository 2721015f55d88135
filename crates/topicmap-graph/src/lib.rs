//! Graph builders over the immutable page set: the entity co-occurrence
//! graph and the per-core-topic intent transition graphs.
//!
//! Both graphs are explicit node/edge tables keyed by stable ids, never
//! pointer-linked nodes, so snapshots serialize deterministically and
//! ownership stays trivial.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

mod entity;
mod intent;

pub use entity::{EntityEdge, EntityGraph};
pub use intent::{build_intent_graphs, IntentEdge, IntentGraph};
