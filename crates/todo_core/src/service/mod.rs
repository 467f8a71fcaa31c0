//! Store services exposed to view layers.
//!
//! # Responsibility
//! - Own the canonical todo snapshot and mediate all durable writes.
//! - Republish the full snapshot to observers after every commit.
//!
//! # Invariants
//! - The snapshot only changes after the matching repository call commits.

pub mod subscription;
pub mod todo_store;
