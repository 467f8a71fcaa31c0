//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the keyed record contract the todo store depends on.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Every repository call commits or fails as a single unit.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to DB transport errors.

pub mod memory_repo;
pub mod todo_repo;
