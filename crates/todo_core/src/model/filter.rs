//! Read-side filter projections over todo snapshots.
//!
//! Filters are transient view selections; they are never persisted and never
//! touch durable storage.

use crate::model::todo::{Priority, Todo, TodoValidationError};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Completion-status selection offered by list views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    /// Maps the selection onto the `completed` predicate, `None` meaning any.
    pub fn completed(self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Active => Some(false),
            Self::Completed => Some(true),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl Display for StatusFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = TodoValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(TodoValidationError::UnknownStatusFilter(other.to_string())),
        }
    }
}

/// Combined view filter selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub status: StatusFilter,
    /// `None` matches every priority.
    pub priority: Option<Priority>,
}

impl TodoFilter {
    pub fn new(status: StatusFilter, priority: Option<Priority>) -> Self {
        Self { status, priority }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        matches_predicates(todo, self.status.completed(), self.priority)
    }

    /// Keeps matching todos in their original relative order.
    pub fn apply(&self, todos: &[Todo]) -> Vec<Todo> {
        filter_todos(todos, self.status.completed(), self.priority)
    }
}

/// Pure projection: both predicates are optional and combine with AND.
pub fn filter_todos(
    todos: &[Todo],
    completed: Option<bool>,
    priority: Option<Priority>,
) -> Vec<Todo> {
    todos
        .iter()
        .filter(|todo| matches_predicates(todo, completed, priority))
        .cloned()
        .collect()
}

fn matches_predicates(todo: &Todo, completed: Option<bool>, priority: Option<Priority>) -> bool {
    completed.map_or(true, |wanted| todo.completed == wanted)
        && priority.map_or(true, |wanted| todo.priority == wanted)
}
