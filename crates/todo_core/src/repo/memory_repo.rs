//! Non-persistent repository backing degraded store mode.
//!
//! Mirrors `SqliteTodoRepository` semantics (duplicate/not-found errors,
//! creation-order listing) without touching disk.

use crate::model::todo::{Todo, TodoId};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use std::cell::RefCell;

/// In-memory todo records kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryTodoRepository {
    todos: RefCell<Vec<Todo>>,
}

impl MemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TodoRepository for MemoryTodoRepository {
    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        Ok(self.todos.borrow().clone())
    }

    fn get_todo(&self, id: &TodoId) -> RepoResult<Option<Todo>> {
        Ok(self.todos.borrow().iter().find(|todo| todo.id == *id).cloned())
    }

    fn insert_todo(&self, todo: &Todo) -> RepoResult<()> {
        let mut todos = self.todos.borrow_mut();
        if todos.iter().any(|existing| existing.id == todo.id) {
            return Err(RepoError::Duplicate(todo.id));
        }
        todos.push(todo.clone());
        Ok(())
    }

    fn update_todo(&self, todo: &Todo) -> RepoResult<()> {
        let mut todos = self.todos.borrow_mut();
        let slot = todos
            .iter_mut()
            .find(|existing| existing.id == todo.id)
            .ok_or(RepoError::NotFound(todo.id))?;
        let created_at = slot.created_at;
        *slot = todo.clone();
        slot.created_at = created_at;
        Ok(())
    }

    fn delete_todo(&self, id: &TodoId) -> RepoResult<bool> {
        let mut todos = self.todos.borrow_mut();
        let before = todos.len();
        todos.retain(|todo| todo.id != *id);
        Ok(todos.len() != before)
    }
}
