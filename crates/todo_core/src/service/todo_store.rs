//! Todo store: the single source of truth for todo records.
//!
//! # Responsibility
//! - Load committed records at startup and keep an in-memory snapshot.
//! - Run every mutation against the repository before touching the snapshot.
//! - Republish the full snapshot to observers once per successful mutation.
//!
//! # Invariants
//! - The snapshot equals the last committed repository state.
//! - Failed repository calls leave the snapshot and observers untouched.
//! - `id` and `created_at` of a stored todo never change.
//! - Logs carry ids and counts only, never titles or descriptions.

use crate::config::{StorageLocation, StoreConfig};
use crate::db::{open_db, open_db_in_memory};
use crate::model::filter::filter_todos;
use crate::model::todo::{now_epoch_ms, NewTodo, Priority, Todo, TodoId};
use crate::repo::memory_repo::MemoryTodoRepository;
use crate::repo::todo_repo::{RepoError, SqliteTodoRepository, TodoRepository};
use crate::service::subscription::{Snapshot, SubscriberRegistry, Subscription};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failures reported to the caller that issued the operation.
#[derive(Debug)]
pub enum StoreError {
    /// Durable storage could not be opened or loaded; the store degraded.
    StorageUnavailable(RepoError),
    /// A single read did not complete.
    StorageRead(RepoError),
    /// A single write did not commit; nothing changed.
    StorageWrite(RepoError),
    /// Target todo does not exist.
    NotFound(TodoId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "todo storage unavailable: {err}"),
            Self::StorageRead(err) => write!(f, "todo storage read failed: {err}"),
            Self::StorageWrite(err) => write!(f, "todo storage write failed: {err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) | Self::StorageRead(err) | Self::StorageWrite(err) => {
                Some(err)
            }
            Self::NotFound(_) => None,
        }
    }
}

/// Whether committed data survives the store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Backed by the configured repository.
    Persistent,
    /// Durable storage failed to open; records live in memory only.
    Degraded,
}

/// Outcome of `TodoStore::clear_completed`.
#[derive(Debug, Default)]
pub struct ClearCompletedReport {
    pub removed: Vec<TodoId>,
    pub failed: Vec<(TodoId, StoreError)>,
}

impl ClearCompletedReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owned todo store. Construct at startup, drop at shutdown.
pub struct TodoStore {
    repo: Box<dyn TodoRepository>,
    snapshot: Snapshot,
    subscribers: SubscriberRegistry,
    mode: StoreMode,
    unavailable: Option<StoreError>,
}

impl TodoStore {
    /// Opens durable storage per `config` and loads existing records.
    ///
    /// Never fails: when the database cannot be opened or loaded the error is
    /// logged once and the store continues with an empty in-memory backend.
    pub fn open(config: &StoreConfig) -> Self {
        match open_sqlite_repository(config).and_then(|repo| Self::load(Box::new(repo))) {
            Ok(store) => {
                info!(
                    "event=store_open module=store status=ok mode=persistent todo_count={}",
                    store.snapshot.len()
                );
                store
            }
            Err(err) => Self::degraded(err),
        }
    }

    /// Builds a store over any repository and loads its records.
    ///
    /// # Errors
    /// - `StorageRead` when the initial load fails.
    pub fn with_repository(repo: Box<dyn TodoRepository>) -> StoreResult<Self> {
        Self::load(repo).map_err(StoreError::StorageRead)
    }

    fn load(repo: Box<dyn TodoRepository>) -> Result<Self, RepoError> {
        let todos = repo.list_todos()?;
        Ok(Self {
            repo,
            snapshot: Arc::from(todos),
            subscribers: SubscriberRegistry::default(),
            mode: StoreMode::Persistent,
            unavailable: None,
        })
    }

    fn degraded(err: RepoError) -> Self {
        error!(
            "event=store_open module=store status=error mode=degraded error_code=storage_unavailable error={}",
            err
        );
        Self {
            repo: Box::new(MemoryTodoRepository::new()),
            snapshot: Arc::from(Vec::new()),
            subscribers: SubscriberRegistry::default(),
            mode: StoreMode::Degraded,
            unavailable: Some(StoreError::StorageUnavailable(err)),
        }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn is_persistent(&self) -> bool {
        self.mode == StoreMode::Persistent
    }

    /// The open failure that put the store into degraded mode, if any.
    pub fn unavailable_reason(&self) -> Option<&StoreError> {
        self.unavailable.as_ref()
    }

    /// Latest committed snapshot.
    pub fn list(&self) -> Snapshot {
        Arc::clone(&self.snapshot)
    }

    /// Looks up one todo in the snapshot without touching storage.
    pub fn find(&self, id: &TodoId) -> Option<&Todo> {
        self.snapshot.iter().find(|todo| todo.id == *id)
    }

    /// Registers an observer primed with the current snapshot.
    pub fn subscribe(&mut self) -> Subscription {
        self.subscribers.subscribe(&self.snapshot)
    }

    /// Stops delivery to `subscription`. Dropping it has the same effect.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.subscribers.unsubscribe(subscription.id())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Reads one todo from durable storage.
    pub fn get(&self, id: &TodoId) -> StoreResult<Option<Todo>> {
        self.repo.get_todo(id).map_err(|err| {
            error!(
                "event=todo_get module=store status=error todo_id={} error={}",
                id, err
            );
            StoreError::StorageRead(err)
        })
    }

    /// Persists a new todo and appends it to the snapshot.
    ///
    /// # Errors
    /// - `StorageWrite` when the insert does not commit (including an id
    ///   collision). The snapshot is unchanged.
    pub fn add(&mut self, request: NewTodo) -> StoreResult<Todo> {
        let todo = Todo::new(request);
        if let Err(err) = self.repo.insert_todo(&todo) {
            error!(
                "event=todo_add module=store status=error todo_id={} error={}",
                todo.id, err
            );
            return Err(StoreError::StorageWrite(err));
        }

        let mut todos = self.snapshot.to_vec();
        todos.push(todo.clone());
        self.commit(todos);
        debug!("event=todo_add module=store status=ok todo_id={}", todo.id);
        Ok(todo)
    }

    /// Overwrites an existing todo and replaces its snapshot entry.
    ///
    /// `updated_at` is stamped here and never moves backwards. The stored
    /// `created_at` wins over the caller's copy.
    ///
    /// # Errors
    /// - `NotFound` when no record with `todo.id` exists.
    /// - `StorageWrite` when the write does not commit.
    pub fn update(&mut self, todo: Todo) -> StoreResult<Todo> {
        let mut updated = todo;
        let floor = match self.find(&updated.id) {
            Some(current) => {
                updated.created_at = current.created_at;
                current.last_modified()
            }
            None => updated.last_modified(),
        };
        updated.updated_at = Some(now_epoch_ms().max(floor));

        match self.repo.update_todo(&updated) {
            Ok(()) => {}
            Err(RepoError::NotFound(id)) => {
                warn!("event=todo_update module=store status=error error_code=not_found todo_id={id}");
                return Err(StoreError::NotFound(id));
            }
            Err(err) => {
                error!(
                    "event=todo_update module=store status=error todo_id={} error={}",
                    updated.id, err
                );
                return Err(StoreError::StorageWrite(err));
            }
        }

        let todos = self
            .snapshot
            .iter()
            .map(|existing| {
                if existing.id == updated.id {
                    updated.clone()
                } else {
                    existing.clone()
                }
            })
            .collect();
        self.commit(todos);
        debug!(
            "event=todo_update module=store status=ok todo_id={}",
            updated.id
        );
        Ok(updated)
    }

    /// Flips `completed` on a snapshot entry and commits it via `update`.
    pub fn toggle_completed(&mut self, id: &TodoId) -> StoreResult<Todo> {
        let mut todo = self.find(id).cloned().ok_or(StoreError::NotFound(*id))?;
        todo.completed = !todo.completed;
        self.update(todo)
    }

    /// Removes a todo. Deleting a missing id succeeds and still republishes.
    ///
    /// # Errors
    /// - `StorageWrite` when the delete does not commit.
    pub fn delete(&mut self, id: &TodoId) -> StoreResult<()> {
        let existed = self.repo.delete_todo(id).map_err(|err| {
            error!(
                "event=todo_delete module=store status=error todo_id={} error={}",
                id, err
            );
            StoreError::StorageWrite(err)
        })?;

        let todos = self
            .snapshot
            .iter()
            .filter(|todo| todo.id != *id)
            .cloned()
            .collect();
        self.commit(todos);
        debug!("event=todo_delete module=store status=ok todo_id={id} existed={existed}");
        Ok(())
    }

    /// Deletes every completed todo one by one.
    ///
    /// Each delete commits or fails independently; failures do not stop the
    /// remaining deletes.
    pub fn clear_completed(&mut self) -> ClearCompletedReport {
        let completed: Vec<TodoId> = self
            .snapshot
            .iter()
            .filter(|todo| todo.completed)
            .map(|todo| todo.id)
            .collect();

        let mut report = ClearCompletedReport::default();
        for id in completed {
            match self.delete(&id) {
                Ok(()) => report.removed.push(id),
                Err(err) => report.failed.push((id, err)),
            }
        }

        info!(
            "event=todo_clear_completed module=store status={} removed={} failed={}",
            if report.is_complete() { "ok" } else { "partial" },
            report.removed.len(),
            report.failed.len()
        );
        report
    }

    /// Snapshot projection; both predicates optional and combined with AND.
    pub fn filtered(&self, completed: Option<bool>, priority: Option<Priority>) -> Vec<Todo> {
        filter_todos(&self.snapshot, completed, priority)
    }

    /// Number of todos not yet completed.
    pub fn active_count(&self) -> usize {
        self.snapshot.iter().filter(|todo| todo.is_active()).count()
    }

    pub fn has_completed(&self) -> bool {
        self.snapshot.iter().any(|todo| todo.completed)
    }

    fn commit(&mut self, todos: Vec<Todo>) {
        self.snapshot = Arc::from(todos);
        self.subscribers.publish(&self.snapshot);
    }
}

fn open_sqlite_repository(config: &StoreConfig) -> Result<SqliteTodoRepository, RepoError> {
    let conn = match &config.storage {
        StorageLocation::File(path) => open_db(path)?,
        StorageLocation::InMemory => open_db_in_memory()?,
    };
    SqliteTodoRepository::try_new(conn)
}
