//! Core domain logic for the local-first todo store.
//! This crate owns the canonical todo collection and its durable storage.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{StorageLocation, StoreConfig, DEFAULT_DB_FILE_NAME};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::filter::{filter_todos, StatusFilter, TodoFilter};
pub use model::todo::{
    now_epoch_ms, validate_title, NewTodo, Priority, Todo, TodoId, TodoValidationError,
};
pub use repo::memory_repo::MemoryTodoRepository;
pub use repo::todo_repo::{RepoError, RepoResult, SqliteTodoRepository, TodoRepository};
pub use service::subscription::{Snapshot, Subscription};
pub use service::todo_store::{
    ClearCompletedReport, StoreError, StoreMode, StoreResult, TodoStore,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
