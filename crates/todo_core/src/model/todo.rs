//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record persisted by the store.
//! - Provide caller-side title validation for add/edit flows.
//!
//! # Invariants
//! - `id` is stable and never reused for another todo.
//! - `created_at` never changes after creation.
//! - `updated_at`, when set, is not earlier than `created_at`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for a todo record.
pub type TodoId = Uuid;

/// Todo urgency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// All priorities in ascending urgency.
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Stable lowercase name, shared by storage and serde.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TodoValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TodoValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// Caller-side validation failures for todo input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Title is empty or whitespace-only.
    BlankTitle,
    /// Priority text is not one of `low|medium|high`.
    UnknownPriority(String),
    /// Status filter text is not one of `all|active|completed`.
    UnknownStatusFilter(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "todo title cannot be empty"),
            Self::UnknownPriority(value) => {
                write!(f, "unknown priority `{value}`; expected low|medium|high")
            }
            Self::UnknownStatusFilter(value) => {
                write!(f, "unknown status filter `{value}`; expected all|active|completed")
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Rejects titles that contain no visible characters.
///
/// The store never calls this; callers run it before issuing mutations.
pub fn validate_title(title: &str) -> Result<(), TodoValidationError> {
    if title.trim().is_empty() {
        return Err(TodoValidationError::BlankTitle);
    }
    Ok(())
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Assigned at creation, immutable afterward.
    pub id: TodoId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds of the last committed update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Todo {
    /// Builds a fresh record from an add request with a generated ID.
    pub fn new(request: NewTodo) -> Self {
        Self::with_id(Uuid::new_v4(), request, now_epoch_ms())
    }

    /// Builds a record with caller-provided identity and creation time.
    ///
    /// Lets tests pin ids and timestamps; `Todo::new` is the store path.
    pub fn with_id(id: TodoId, request: NewTodo, created_at: i64) -> Self {
        Self {
            id,
            title: request.title,
            description: request.description,
            priority: request.priority.unwrap_or_default(),
            completed: request.completed.unwrap_or(false),
            created_at,
            updated_at: None,
        }
    }

    /// Returns whether this todo still counts towards "items left".
    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Most recent committed mutation time.
    pub fn last_modified(&self) -> i64 {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Add request. Omitted fields fall back to store defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Caller-side check run before the request reaches the store.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        validate_title(&self.title)
    }
}
