//! Persistence seam for users and tasks.
//!
//! The services talk to [`UserStore`] and [`TaskStore`] only. [`PgStore`] is the
//! production implementation; [`MemoryStore`] backs local runs without a database and
//! the test suite. Neither adds locking of its own beyond what a single statement
//! needs: concurrent updates to the same task are last-write-wins.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{NewTask, NewUser, Task, TaskChanges, TaskQuery, TaskStats, User, UserRecord};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. a duplicate email).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// A referenced row does not exist (e.g. an unknown assignee).
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a user. Fails with [`StoreError::UniqueViolation`] when the email exists.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Exact, case-sensitive email lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// Task store. Every returned [`Task`] carries its creator and assignee summaries.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    /// Applies `changes` and bumps `updated_at`. `None` when the task does not exist.
    async fn update_task(&self, id: Uuid, changes: TaskChanges)
        -> Result<Option<Task>, StoreError>;

    /// Returns whether a row was deleted.
    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn task_stats(&self, user_id: Uuid, now: DateTime<Utc>)
        -> Result<TaskStats, StoreError>;
}
