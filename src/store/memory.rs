use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TaskStore, UserStore};
use crate::models::{
    NewTask, NewUser, Task, TaskChanges, TaskPriority, TaskQuery, TaskStats, TaskStatus, User,
    UserRecord, UserSummary,
};

/// Task row without the joined user summaries.
#[derive(Debug, Clone)]
struct TaskRecord {
    id: Uuid,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    priority: TaskPriority,
    status: TaskStatus,
    creator_id: Uuid,
    assigned_to_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    emails: HashMap<String, Uuid>,
    tasks: HashMap<Uuid, TaskRecord>,
}

impl Tables {
    fn check_user(&self, id: Uuid) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("users.id = {}", id)))
        }
    }

    /// Joins creator/assignee summaries onto a record. Users are never removed, so a
    /// referenced user is always present.
    fn join(&self, record: &TaskRecord) -> Option<Task> {
        let creator = self.users.get(&record.creator_id).map(UserSummary::from)?;
        let assigned_to = record
            .assigned_to_id
            .and_then(|id| self.users.get(&id))
            .map(UserSummary::from);
        Some(Task {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            due_date: record.due_date,
            priority: record.priority,
            status: record.status,
            creator_id: record.creator_id,
            assigned_to_id: record.assigned_to_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            creator,
            assigned_to,
        })
    }
}

/// In-process store for both users and tasks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn task_count(&self) -> usize {
        self.tables.read().await.tasks.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.emails.contains_key(&user.email) {
            return Err(StoreError::UniqueViolation("users.email".to_string()));
        }
        let record = user.into_record();
        tables.emails.insert(record.email.clone(), record.id);
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().map(User::from).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_user(task.creator_id)?;
        if let Some(assignee) = task.assigned_to_id {
            tables.check_user(assignee)?;
        }
        let now = Utc::now();
        let record = TaskRecord {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            priority: task.priority,
            status: TaskStatus::Todo,
            creator_id: task.creator_id,
            assigned_to_id: task.assigned_to_id,
            created_at: now,
            updated_at: now,
        };
        let joined = tables.join(&record);
        tables.tasks.insert(record.id, record);
        joined.ok_or_else(|| StoreError::ForeignKeyViolation("tasks.creator_id".to_string()))
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).and_then(|record| tables.join(record)))
    }

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter_map(|record| tables.join(record))
            .filter(|task| query.matches(task))
            .collect();
        query.sort(&mut tasks);
        Ok(tasks)
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(assignee) = changes.assigned_to_id.as_set() {
            tables.check_user(*assignee)?;
        }
        let Some(record) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            record.title = title;
        }
        if let Some(description) = changes.description {
            record.description = description;
        }
        if let Some(due_date) = changes.due_date {
            record.due_date = due_date;
        }
        if let Some(priority) = changes.priority {
            record.priority = priority;
        }
        if let Some(status) = changes.status {
            record.status = status;
        }
        changes.assigned_to_id.apply_to(&mut record.assigned_to_id);
        record.updated_at = Utc::now();

        let record = record.clone();
        Ok(tables.join(&record))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn task_stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<TaskStats, StoreError> {
        let tables = self.tables.read().await;
        let mut stats = TaskStats::default();
        for record in tables.tasks.values() {
            let created = record.creator_id == user_id;
            let assigned = record.assigned_to_id == Some(user_id);
            if !(created || assigned) {
                continue;
            }
            stats.total += 1;
            stats.created += i64::from(created);
            stats.assigned += i64::from(assigned);
            if record.due_date < now && record.status != TaskStatus::Completed {
                stats.overdue += 1;
            }
        }
        Ok(stats)
    }
}
