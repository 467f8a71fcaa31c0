//! Domain model for todo records and their read-side projections.
//!
//! # Responsibility
//! - Define the canonical `Todo` record and the `NewTodo` add request.
//! - Define filter selections applied over published snapshots.
//!
//! # Invariants
//! - Every todo is identified by a stable `TodoId` that is never reused.
//! - `created_at` is set once; `updated_at` stays `None` until first update.

pub mod filter;
pub mod todo;
