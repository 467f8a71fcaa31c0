use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use todo_core::db::migrations::latest_version;
use todo_core::db::open_db;
use todo_core::{
    now_epoch_ms, MemoryTodoRepository, NewTodo, Priority, RepoError, RepoResult,
    SqliteTodoRepository, StatusFilter, StoreConfig, StoreError, StoreMode, Todo, TodoFilter,
    TodoId, TodoRepository, TodoStore,
};
use uuid::Uuid;

/// Memory backend whose writes (and optionally reads) can be made to fail.
struct FlakyRepository {
    inner: MemoryTodoRepository,
    fail_writes: Rc<Cell<bool>>,
    fail_reads: Rc<Cell<bool>>,
    failing_delete: Option<TodoId>,
}

impl FlakyRepository {
    fn new() -> (Self, Rc<Cell<bool>>, Rc<Cell<bool>>) {
        let fail_writes = Rc::new(Cell::new(false));
        let fail_reads = Rc::new(Cell::new(false));
        let repo = Self {
            inner: MemoryTodoRepository::new(),
            fail_writes: Rc::clone(&fail_writes),
            fail_reads: Rc::clone(&fail_reads),
            failing_delete: None,
        };
        (repo, fail_writes, fail_reads)
    }

    fn check_write(&self) -> RepoResult<()> {
        if self.fail_writes.get() {
            return Err(disk_full());
        }
        Ok(())
    }
}

impl TodoRepository for FlakyRepository {
    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        if self.fail_reads.get() {
            return Err(disk_full());
        }
        self.inner.list_todos()
    }

    fn get_todo(&self, id: &TodoId) -> RepoResult<Option<Todo>> {
        if self.fail_reads.get() {
            return Err(disk_full());
        }
        self.inner.get_todo(id)
    }

    fn insert_todo(&self, todo: &Todo) -> RepoResult<()> {
        self.check_write()?;
        self.inner.insert_todo(todo)
    }

    fn update_todo(&self, todo: &Todo) -> RepoResult<()> {
        self.check_write()?;
        self.inner.update_todo(todo)
    }

    fn delete_todo(&self, id: &TodoId) -> RepoResult<bool> {
        self.check_write()?;
        if self.failing_delete == Some(*id) {
            return Err(disk_full());
        }
        self.inner.delete_todo(id)
    }
}

fn disk_full() -> RepoError {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
        Some("database or disk is full".to_string()),
    )
    .into()
}

fn memory_store() -> TodoStore {
    TodoStore::open(&StoreConfig::in_memory())
}

#[test]
fn open_in_memory_is_persistent_mode_and_empty() {
    let store = memory_store();
    assert_eq!(store.mode(), StoreMode::Persistent);
    assert!(store.unavailable_reason().is_none());
    assert!(store.list().is_empty());
}

#[test]
fn add_toggle_delete_scenario() {
    let mut store = memory_store();
    let subscription = store.subscribe();
    assert!(subscription.try_recv().unwrap().is_empty());

    let added = store
        .add(NewTodo::new("Buy milk").priority(Priority::High))
        .unwrap();
    let snapshot = subscription.try_recv().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].title, "Buy milk");
    assert_eq!(snapshot[0].priority, Priority::High);
    assert!(!snapshot[0].completed);
    assert!(snapshot[0].updated_at.is_none());

    let toggled = store.toggle_completed(&added.id).unwrap();
    assert!(toggled.completed);
    let snapshot = subscription.try_recv().unwrap();
    assert!(snapshot[0].completed);
    assert!(snapshot[0].updated_at.is_some());

    store.delete(&added.id).unwrap();
    assert!(subscription.try_recv().unwrap().is_empty());
    assert!(store.list().is_empty());
    assert!(subscription.try_recv().is_err());
}

#[test]
fn add_generates_unique_ids_and_appends_once() {
    let mut store = memory_store();
    let mut ids = HashSet::new();
    for index in 0..20 {
        let todo = store.add(NewTodo::new(format!("task {index}"))).unwrap();
        assert!(ids.insert(todo.id));
        let occurrences = store
            .list()
            .iter()
            .filter(|entry| entry.id == todo.id)
            .count();
        assert_eq!(occurrences, 1);
    }
    assert_eq!(store.list().len(), 20);
}

#[test]
fn update_replaces_only_the_target_entry() {
    let mut store = memory_store();
    let first = store.add(NewTodo::new("first")).unwrap();
    let second = store.add(NewTodo::new("second")).unwrap();
    let third = store.add(NewTodo::new("third")).unwrap();

    let mut edited = second.clone();
    edited.title = "second, edited".to_string();
    edited.description = Some("details".to_string());
    edited.created_at = 1;
    let committed = store.update(edited).unwrap();

    assert_eq!(committed.created_at, second.created_at);
    assert!(committed.updated_at.unwrap() >= second.created_at);

    let snapshot = store.list();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0], first);
    assert_eq!(snapshot[1], committed);
    assert_eq!(snapshot[2], third);
}

#[test]
fn updated_at_never_moves_backwards() {
    let mut store = memory_store();
    let todo = store.add(NewTodo::new("clock skew")).unwrap();

    let mut future = todo.clone();
    future.updated_at = Some(i64::MAX - 1);
    let mut committed = store.update(future).unwrap();
    let stamped = committed.updated_at.unwrap();

    committed.title = "again".to_string();
    let again = store.update(committed).unwrap();
    assert!(again.updated_at.unwrap() >= stamped);
}

#[test]
fn update_unknown_id_is_not_found_and_creates_nothing() {
    let mut store = memory_store();
    let subscription = store.subscribe();
    subscription.drain();

    let ghost = Todo::new(NewTodo::new("ghost"));
    let err = store.update(ghost.clone()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == ghost.id));
    assert!(store.list().is_empty());
    assert!(store.get(&ghost.id).unwrap().is_none());
    assert!(subscription.try_recv().is_err());

    assert!(matches!(
        store.toggle_completed(&ghost.id),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn delete_is_idempotent_and_republishes() {
    let mut store = memory_store();
    let keep = store.add(NewTodo::new("keep")).unwrap();
    let drop_me = store.add(NewTodo::new("drop")).unwrap();
    let subscription = store.subscribe();
    subscription.drain();

    store.delete(&drop_me.id).unwrap();
    let after_first = store.list();
    store.delete(&drop_me.id).unwrap();
    let after_second = store.list();

    assert_eq!(&*after_first, &*after_second);
    assert_eq!(after_second.len(), 1);
    assert_eq!(after_second[0].id, keep.id);
    assert_eq!(subscription.drain().len(), 2);
}

#[test]
fn filtered_projects_the_latest_snapshot() {
    let mut store = memory_store();
    let high = store
        .add(NewTodo::new("high").priority(Priority::High))
        .unwrap();
    let medium = store.add(NewTodo::new("medium")).unwrap();
    store
        .add(NewTodo::new("low").priority(Priority::Low))
        .unwrap();

    let only_medium = store.filtered(None, Some(Priority::Medium));
    assert_eq!(only_medium.len(), 1);
    assert_eq!(only_medium[0].id, medium.id);

    store.toggle_completed(&high.id).unwrap();
    let done = store.filtered(Some(true), None);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, high.id);
    assert!(store.filtered(Some(false), Some(Priority::High)).is_empty());

    let view = TodoFilter::new(StatusFilter::Active, None);
    assert_eq!(view.apply(&store.list()), store.filtered(Some(false), None));
    assert_eq!(store.active_count(), 2);
    assert!(store.has_completed());
}

#[test]
fn clear_completed_removes_only_completed_todos() {
    let mut store = memory_store();
    let a = store.add(NewTodo::new("a").completed(true)).unwrap();
    let b = store.add(NewTodo::new("b")).unwrap();
    let c = store.add(NewTodo::new("c").completed(true)).unwrap();
    let subscription = store.subscribe();
    subscription.drain();

    let report = store.clear_completed();
    assert!(report.is_complete());
    assert_eq!(report.removed, vec![a.id, c.id]);
    assert_eq!(subscription.drain().len(), 2);

    let snapshot = store.list();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, b.id);
    assert!(!store.has_completed());
}

#[test]
fn clear_completed_continues_past_individual_failures() {
    let (mut repo, _, _) = FlakyRepository::new();
    let stuck = Todo::new(NewTodo::new("stuck").completed(true));
    let loose = Todo::new(NewTodo::new("loose").completed(true));
    repo.inner.insert_todo(&stuck).unwrap();
    repo.inner.insert_todo(&loose).unwrap();
    repo.failing_delete = Some(stuck.id);

    let mut store = TodoStore::with_repository(Box::new(repo)).unwrap();
    let report = store.clear_completed();

    assert_eq!(report.removed, vec![loose.id]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, stuck.id);
    assert!(matches!(report.failed[0].1, StoreError::StorageWrite(_)));
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.list()[0].id, stuck.id);
}

#[test]
fn failed_writes_leave_snapshot_and_observers_untouched() {
    let (repo, fail_writes, _) = FlakyRepository::new();
    let mut store = TodoStore::with_repository(Box::new(repo)).unwrap();
    let existing = store.add(NewTodo::new("existing")).unwrap();
    let subscription = store.subscribe();
    subscription.drain();
    let before = store.list();

    fail_writes.set(true);
    assert!(matches!(
        store.add(NewTodo::new("phantom")),
        Err(StoreError::StorageWrite(_))
    ));
    let mut edited = existing.clone();
    edited.title = "never committed".to_string();
    assert!(matches!(
        store.update(edited),
        Err(StoreError::StorageWrite(_))
    ));
    assert!(matches!(
        store.delete(&existing.id),
        Err(StoreError::StorageWrite(_))
    ));

    assert_eq!(&*store.list(), &*before);
    assert!(subscription.try_recv().is_err());

    fail_writes.set(false);
    store.delete(&existing.id).unwrap();
    assert!(store.list().is_empty());
}

#[test]
fn failed_reads_surface_as_storage_read_errors() {
    let (repo, _, fail_reads) = FlakyRepository::new();
    let mut store = TodoStore::with_repository(Box::new(repo)).unwrap();
    let todo = store.add(NewTodo::new("read me")).unwrap();

    assert_eq!(store.get(&todo.id).unwrap().unwrap(), todo);
    fail_reads.set(true);
    assert!(matches!(
        store.get(&todo.id),
        Err(StoreError::StorageRead(_))
    ));
    assert_eq!(store.list().len(), 1);
}

#[test]
fn initial_load_failure_is_a_read_error() {
    let (repo, _, fail_reads) = FlakyRepository::new();
    fail_reads.set(true);
    assert!(matches!(
        TodoStore::with_repository(Box::new(repo)),
        Err(StoreError::StorageRead(_))
    ));
}

#[test]
fn reopening_keeps_append_order_when_clock_steps_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.sqlite3");

    {
        let repo = SqliteTodoRepository::try_new(open_db(&path).unwrap()).unwrap();
        let ahead = Todo::with_id(
            Uuid::new_v4(),
            NewTodo::new("earlier-add"),
            now_epoch_ms() + 60 * 60 * 1000,
        );
        repo.insert_todo(&ahead).unwrap();
    }

    let config = StoreConfig::file(&path);
    let before = {
        let mut store = TodoStore::open(&config);
        store.add(NewTodo::new("later-add")).unwrap();
        store.list()
    };
    let titles: Vec<_> = before.iter().map(|todo| todo.title.as_str()).collect();
    assert_eq!(titles, vec!["earlier-add", "later-add"]);

    let reopened = TodoStore::open(&config);
    assert_eq!(&*reopened.list(), &*before);
}

#[test]
fn reopening_reproduces_the_same_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("todos.sqlite3"));

    let before = {
        let mut store = TodoStore::open(&config);
        assert!(store.is_persistent());
        let first = store
            .add(NewTodo::new("first").description("notes"))
            .unwrap();
        store
            .add(NewTodo::new("second").priority(Priority::Low))
            .unwrap();
        let third = store.add(NewTodo::new("third")).unwrap();
        store.toggle_completed(&first.id).unwrap();
        store.delete(&third.id).unwrap();
        store.list()
    };

    let mut reopened = TodoStore::open(&config);
    assert_eq!(reopened.mode(), StoreMode::Persistent);
    assert_eq!(&*reopened.list(), &*before);

    let subscription = reopened.subscribe();
    assert_eq!(&*subscription.try_recv().unwrap(), &*before);
    reopened.add(NewTodo::new("fourth")).unwrap();
    assert_eq!(subscription.try_recv().unwrap().len(), 3);
}

#[test]
fn unsupported_schema_degrades_to_memory_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "PRAGMA user_version = {};",
        latest_version() + 1
    ))
    .unwrap();
    drop(conn);

    let mut store = TodoStore::open(&StoreConfig::file(&path));
    assert_eq!(store.mode(), StoreMode::Degraded);
    assert!(matches!(
        store.unavailable_reason(),
        Some(StoreError::StorageUnavailable(RepoError::Db(_)))
    ));
    assert!(store.list().is_empty());

    let todo = store.add(NewTodo::new("still usable")).unwrap();
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.get(&todo.id).unwrap().unwrap().id, todo.id);

    drop(store);
    let again = TodoStore::open(&StoreConfig::file(&path));
    assert_eq!(again.mode(), StoreMode::Degraded);
    assert!(again.list().is_empty());
}

#[test]
fn unopenable_path_degrades_to_memory_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("nested").join("todos.sqlite3");

    let store = TodoStore::open(&StoreConfig::file(&path));
    assert!(!store.is_persistent());
    assert!(store.unavailable_reason().is_some());
}

#[test]
fn dropped_and_unsubscribed_observers_stop_receiving() {
    let mut store = memory_store();
    let kept = store.subscribe();
    let dropped = store.subscribe();
    let unsubscribed = store.subscribe();
    assert_eq!(store.subscriber_count(), 3);

    drop(dropped);
    assert!(store.unsubscribe(unsubscribed));
    store.add(NewTodo::new("ping")).unwrap();

    assert_eq!(store.subscriber_count(), 1);
    let latest = kept.latest().unwrap();
    assert_eq!(latest.len(), 1);
}

#[test]
fn observers_on_other_threads_receive_full_snapshots() {
    let mut store = memory_store();
    let subscription = store.subscribe();
    let handle = std::thread::spawn(move || {
        let mut sizes = Vec::new();
        while let Ok(snapshot) = subscription.recv() {
            sizes.push(snapshot.len());
        }
        sizes
    });

    store.add(NewTodo::new("one")).unwrap();
    store.add(NewTodo::new("two")).unwrap();
    drop(store);

    assert_eq!(handle.join().unwrap(), vec![0, 1, 2]);
}

#[test]
fn deleting_unknown_id_republishes_unchanged_snapshot() {
    let mut store = memory_store();
    store.add(NewTodo::new("only")).unwrap();
    let subscription = store.subscribe();
    let primed = subscription.try_recv().unwrap();

    store.delete(&Uuid::new_v4()).unwrap();
    let republished = subscription.try_recv().unwrap();
    assert_eq!(&*republished, &*primed);
}
