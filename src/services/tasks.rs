use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, TaskError};
use crate::models::{
    CreateTaskRequest, Task, TaskFilters, TaskQuery, TaskStats, UpdateTaskRequest,
};
use crate::store::{TaskStore, UserStore};

/// A successful update together with the assignee the task had before it.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub task: Task,
    pub previous_assignee: Option<Uuid>,
}

impl UpdateOutcome {
    pub fn assignee_changed(&self) -> bool {
        self.task.assigned_to_id != self.previous_assignee
    }

    /// The user who just became the assignee, if the update handed the task to someone.
    pub fn new_assignee(&self) -> Option<Uuid> {
        if self.assignee_changed() {
            self.task.assigned_to_id
        } else {
            None
        }
    }
}

/// Task business rules: who may change what, and referential checks on assignees.
///
/// Reads are open to every authenticated caller. Updates are limited to the creator
/// and the current assignee, deletes to the creator.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, users: Arc<dyn UserStore>) -> Self {
        Self { tasks, users }
    }

    async fn ensure_user_exists(&self, id: Uuid) -> Result<(), AppError> {
        match self.users.find_user_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(TaskError::AssigneeNotFound.into()),
        }
    }

    pub async fn create_task(
        &self,
        request: CreateTaskRequest,
        creator_id: Uuid,
    ) -> Result<Task, AppError> {
        let new_task = request.into_new_task(creator_id)?;
        if let Some(assignee) = new_task.assigned_to_id {
            self.ensure_user_exists(assignee).await?;
        }

        let task = self.tasks.insert_task(new_task).await?;
        log::info!("Task {} created by {}", task.id, creator_id);
        Ok(task)
    }

    pub async fn get_tasks(&self, filters: TaskFilters) -> Result<Vec<Task>, AppError> {
        Ok(self.tasks.find_tasks(&TaskQuery::from(filters)).await?)
    }

    /// Any authenticated caller may read any task.
    pub async fn get_task_by_id(&self, id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .find_task(id)
            .await?
            .ok_or_else(|| TaskError::NotFound.into())
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        request: UpdateTaskRequest,
        caller_id: Uuid,
    ) -> Result<UpdateOutcome, AppError> {
        let changes = request.into_changes()?;
        let current = self.get_task_by_id(id).await?;
        if !current.can_update(caller_id) {
            log::warn!("User {} denied update on task {}", caller_id, id);
            return Err(TaskError::Forbidden { action: "update" }.into());
        }
        if let Some(assignee) = changes.assigned_to_id.as_set() {
            self.ensure_user_exists(*assignee).await?;
        }

        let task = self
            .tasks
            .update_task(id, changes)
            .await?
            .ok_or(TaskError::NotFound)?;
        log::info!("Task {} updated by {}", id, caller_id);
        Ok(UpdateOutcome {
            task,
            previous_assignee: current.assigned_to_id,
        })
    }

    /// Deletes the task and returns its last stored state.
    pub async fn delete_task(&self, id: Uuid, caller_id: Uuid) -> Result<Task, AppError> {
        let task = self.get_task_by_id(id).await?;
        if !task.can_delete(caller_id) {
            log::warn!("User {} denied delete on task {}", caller_id, id);
            return Err(TaskError::Forbidden { action: "delete" }.into());
        }

        if !self.tasks.delete_task(id).await? {
            return Err(TaskError::NotFound.into());
        }
        log::info!("Task {} deleted by {}", id, caller_id);
        Ok(task)
    }

    pub async fn get_task_stats(&self, user_id: Uuid) -> Result<TaskStats, AppError> {
        Ok(self.tasks.task_stats(user_id, Utc::now()).await?)
    }

    /// Tasks assigned to the user, earliest due first.
    pub async fn get_my_assigned_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        Ok(self.tasks.find_tasks(&TaskQuery::assigned_to(user_id)).await?)
    }

    /// Tasks the user created, newest first.
    pub async fn get_my_created_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        Ok(self.tasks.find_tasks(&TaskQuery::created_by(user_id)).await?)
    }

    pub async fn get_overdue_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let query = TaskQuery::overdue_for(user_id, Utc::now());
        Ok(self.tasks.find_tasks(&query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::{NewUser, Patch, TaskPriority, TaskStatus};
    use crate::store::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        service: TaskService,
        store: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            Self {
                service: TaskService::new(store.clone(), store.clone()),
                store,
            }
        }

        async fn user(&self, email: &str) -> Uuid {
            self.store
                .insert_user(NewUser {
                    email: email.to_string(),
                    name: email.to_string(),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap()
                .id
        }

        async fn task(&self, creator: Uuid, due_in: Duration) -> Task {
            self.service
                .create_task(request("Test Task", due_in), creator)
                .await
                .unwrap()
        }
    }

    fn request(title: &str, due_in: Duration) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: "Test description".to_string(),
            due_date: (Utc::now() + due_in).to_rfc3339(),
            priority: TaskPriority::High,
            assigned_to_id: None,
        }
    }

    fn assign(user: Uuid) -> UpdateTaskRequest {
        UpdateTaskRequest {
            assigned_to_id: Patch::Set(user),
            ..UpdateTaskRequest::default()
        }
    }

    fn set_status(status: TaskStatus) -> UpdateTaskRequest {
        UpdateTaskRequest {
            status: Patch::Set(status),
            ..UpdateTaskRequest::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;

        let task = fx.task(u1, Duration::days(1)).await;
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.creator_id, u1);
        assert_eq!(task.assigned_to_id, None);
        assert_eq!(task.creator.id, u1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_titles_without_persisting() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;

        for title in [String::new(), "x".repeat(101)] {
            let err = fx
                .service
                .create_task(request(&title, Duration::days(1)), u1)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(ValidationError { .. })));
        }
        assert_eq!(fx.store.task_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_with_unknown_assignee() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let mut input = request("Orphan", Duration::days(1));
        input.assigned_to_id = Some(Uuid::new_v4());

        let err = fx.service.create_task(input, u1).await.unwrap_err();
        assert!(matches!(err, AppError::Task(TaskError::AssigneeNotFound)));
        assert_eq!(fx.store.task_count().await, 0);
    }

    #[tokio::test]
    async fn test_assignee_can_update_but_not_delete() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let u2 = fx.user("u2@example.com").await;
        let task = fx.task(u1, Duration::days(1)).await;

        let outcome = fx.service.update_task(task.id, assign(u2), u1).await.unwrap();
        assert!(outcome.assignee_changed());
        assert_eq!(outcome.new_assignee(), Some(u2));
        assert_eq!(outcome.previous_assignee, None);

        let outcome = fx
            .service
            .update_task(task.id, set_status(TaskStatus::Completed), u2)
            .await
            .unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Completed);
        assert!(!outcome.assignee_changed());

        let err = fx.service.delete_task(task.id, u2).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Task(TaskError::Forbidden { action: "delete" })
        ));
        assert!(fx.store.find_task(task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stranger_cannot_update() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let stranger = fx.user("stranger@example.com").await;
        let task = fx.task(u1, Duration::days(1)).await;

        let err = fx
            .service
            .update_task(task.id, set_status(TaskStatus::Review), stranger)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Task(TaskError::Forbidden { action: "update" })
        ));
        let stored = fx.store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored, task);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let u2 = fx.user("u2@example.com").await;
        let task = fx.task(u1, Duration::days(1)).await;
        let patch = UpdateTaskRequest {
            title: Patch::Set("Renamed".to_string()),
            priority: Patch::Set(TaskPriority::Urgent),
            assigned_to_id: Patch::Set(u2),
            ..UpdateTaskRequest::default()
        };

        let once = fx
            .service
            .update_task(task.id, patch.clone(), u1)
            .await
            .unwrap()
            .task;
        let twice = fx.service.update_task(task.id, patch, u1).await.unwrap().task;
        assert_eq!(
            Task {
                updated_at: once.updated_at,
                ..twice
            },
            once
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_task() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;

        let err = fx
            .service
            .update_task(Uuid::new_v4(), set_status(TaskStatus::Review), u1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Task(TaskError::NotFound)));

        let err = fx.service.delete_task(Uuid::new_v4(), u1).await.unwrap_err();
        assert!(matches!(err, AppError::Task(TaskError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_to_unknown_assignee() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let task = fx.task(u1, Duration::days(1)).await;

        let err = fx
            .service
            .update_task(task.id, assign(Uuid::new_v4()), u1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Task(TaskError::AssigneeNotFound)));
    }

    #[tokio::test]
    async fn test_delete_returns_prior_state() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let task = fx.task(u1, Duration::days(1)).await;

        let deleted = fx.service.delete_task(task.id, u1).await.unwrap();
        assert_eq!(deleted, task);
        assert_eq!(fx.store.task_count().await, 0);
    }

    #[tokio::test]
    async fn test_stats_and_projections() {
        let fx = Fixture::new();
        let u1 = fx.user("u1@example.com").await;
        let u2 = fx.user("u2@example.com").await;

        let late = fx.task(u1, Duration::days(-1)).await;
        fx.task(u1, Duration::days(2)).await;
        let handed = fx.task(u2, Duration::days(3)).await;
        fx.service
            .update_task(handed.id, assign(u1), u2)
            .await
            .unwrap();

        let stats = fx.service.get_task_stats(u1).await.unwrap();
        assert_eq!(
            stats,
            TaskStats {
                total: 3,
                assigned: 1,
                created: 2,
                overdue: 1
            }
        );

        let overdue = fx.service.get_overdue_tasks(u1).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);

        let assigned = fx.service.get_my_assigned_tasks(u1).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, handed.id);

        let created = fx.service.get_my_created_tasks(u1).await.unwrap();
        assert_eq!(created.len(), 2);
        assert!(created[0].created_at >= created[1].created_at);
    }
}
