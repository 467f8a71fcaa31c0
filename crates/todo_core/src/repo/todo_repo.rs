//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide get-all/get/insert/update/delete over canonical `todos` storage.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `insert_todo` never overwrites an existing id.
//! - `update_todo` never creates a missing id.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::todo::{Priority, Todo, TodoId};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    priority,
    completed,
    created_at,
    updated_at
FROM todos";

const TODOS_TABLE: &str = "todos";
const REQUIRED_TODO_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "priority",
    "completed",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(TodoId),
    Duplicate(TodoId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Duplicate(id) => write!(f, "todo already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Keyed record store the todo store depends on.
///
/// Each call commits or fails on its own; callers get no multi-record
/// transaction guarantee.
pub trait TodoRepository {
    /// Returns every stored todo in insertion order, independent of the
    /// wall-clock `created_at` values.
    fn list_todos(&self) -> RepoResult<Vec<Todo>>;
    fn get_todo(&self, id: &TodoId) -> RepoResult<Option<Todo>>;
    /// Fails with `RepoError::Duplicate` when `todo.id` is already stored.
    fn insert_todo(&self, todo: &Todo) -> RepoResult<()>;
    /// Fails with `RepoError::NotFound` when `todo.id` is not stored.
    fn update_todo(&self, todo: &Todo) -> RepoResult<()>;
    /// Returns whether a record was removed. Missing ids are not an error.
    fn delete_todo(&self, id: &TodoId) -> RepoResult<bool>;
}

/// SQLite-backed todo repository owning its connection.
pub struct SqliteTodoRepository {
    conn: Connection,
}

impl SqliteTodoRepository {
    /// Wraps a migrated connection from `db::open_db`/`db::open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the schema is
    ///   not the one this binary expects.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection, mostly for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TodoRepository for SqliteTodoRepository {
    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut todos = Vec::new();

        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }

        Ok(todos)
    }

    fn get_todo(&self, id: &TodoId) -> RepoResult<Option<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }

        Ok(None)
    }

    fn insert_todo(&self, todo: &Todo) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO todos (
                id,
                title,
                description,
                priority,
                completed,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                todo.id.to_string(),
                todo.title.as_str(),
                todo.description.as_deref(),
                todo.priority.as_str(),
                bool_to_int(todo.completed),
                todo.created_at,
                todo.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => Err(RepoError::Duplicate(todo.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn update_todo(&self, todo: &Todo) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET
                title = ?1,
                description = ?2,
                priority = ?3,
                completed = ?4,
                updated_at = ?5
             WHERE id = ?6;",
            params![
                todo.title.as_str(),
                todo.description.as_deref(),
                todo.priority.as_str(),
                bool_to_int(todo.completed),
                todo.updated_at,
                todo.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(todo.id));
        }

        Ok(())
    }

    fn delete_todo(&self, id: &TodoId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [TODOS_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(TODOS_TABLE));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({TODOS_TABLE});"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if let Some(missing) = REQUIRED_TODO_COLUMNS
        .iter()
        .find(|required| !columns.iter().any(|column| column == *required))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: TODOS_TABLE,
            column: *missing,
        });
    }

    Ok(())
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in todos.id"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = parse_priority(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in todos.priority"
        ))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed"
            )));
        }
    };

    Ok(Todo {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        completed,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_priority(value: &str) -> Option<Priority> {
    Priority::ALL
        .into_iter()
        .find(|priority| priority.as_str() == value)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
