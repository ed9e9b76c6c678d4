use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;
use validator::{Validate, ValidationError as FieldError};

use super::patch::Patch;
use super::user::UserSummary;
use crate::error::ValidationError;

pub const TITLE_MAX_CHARS: usize = 100;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum; ordering follows declaration order.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
///
/// TODO -> IN_PROGRESS -> REVIEW -> COMPLETED is the usual flow, but any status may be
/// set from any other; transitions are not validated.
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
}

/// Represents a task as returned by the API, with creator and assignee summaries joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub creator_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: UserSummary,
    pub assigned_to: Option<UserSummary>,
}

impl Task {
    /// Overdue means past due and not completed. Derived, never stored.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && self.status != TaskStatus::Completed
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assigned_to_id == Some(user_id)
    }

    /// Creator or current assignee may edit.
    pub fn can_update(&self, user_id: Uuid) -> bool {
        self.is_creator(user_id) || self.is_assignee(user_id)
    }

    /// Only the creator may delete; the assignee may not.
    pub fn can_delete(&self, user_id: Uuid) -> bool {
        self.is_creator(user_id)
    }
}

/// Input structure for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be between 1 and 100 characters"
    ))]
    pub title: String,
    pub description: String,
    /// ISO-8601 / RFC 3339 timestamp.
    #[validate(custom = "validate_timestamp")]
    pub due_date: String,
    pub priority: TaskPriority,
    #[serde(default)]
    pub assigned_to_id: Option<Uuid>,
}

impl CreateTaskRequest {
    /// Validates the request and turns it into a store insert owned by `creator_id`.
    pub fn into_new_task(self, creator_id: Uuid) -> Result<NewTask, ValidationError> {
        self.validate()?;
        Ok(NewTask {
            due_date: parse_timestamp("dueDate", &self.due_date)?,
            title: self.title,
            description: self.description,
            priority: self.priority,
            creator_id,
            assigned_to_id: self.assigned_to_id,
        })
    }
}

/// Partial update of a task. Missing keys are left untouched; `assignedToId: null`
/// clears the assignee. `null` is rejected for every other field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Patch::is_absent")]
    #[validate(custom = "validate_title_patch")]
    pub title: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    #[validate(custom = "validate_present_text")]
    pub description: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    #[validate(custom = "validate_timestamp_patch")]
    pub due_date: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    #[validate(custom = "validate_present_priority")]
    pub priority: Patch<TaskPriority>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    #[validate(custom = "validate_present_status")]
    pub status: Patch<TaskStatus>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub assigned_to_id: Patch<Uuid>,
}

impl UpdateTaskRequest {
    /// Validates the request and converts it into store-level changes.
    pub fn into_changes(self) -> Result<TaskChanges, ValidationError> {
        self.validate()?;
        let due_date = match self.due_date {
            Patch::Set(raw) => Some(parse_timestamp("dueDate", &raw)?),
            _ => None,
        };
        Ok(TaskChanges {
            title: self.title.as_set().cloned(),
            description: self.description.as_set().cloned(),
            due_date,
            priority: self.priority.as_set().copied(),
            status: self.status.as_set().copied(),
            assigned_to_id: self.assigned_to_id,
        })
    }
}

/// A validated task insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub creator_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
}

/// A validated set of changes. `None` fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assigned_to_id: Patch<Uuid>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assigned_to_id.is_absent()
    }
}

/// Task fields accepted by `sortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    Description,
    DueDate,
    Priority,
    Status,
    #[default]
    CreatedAt,
    UpdatedAt,
    CreatorId,
    AssignedToId,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Title => "t.title",
            SortField::Description => "t.description",
            SortField::DueDate => "t.due_date",
            SortField::Priority => "t.priority",
            SortField::Status => "t.status",
            SortField::CreatedAt => "t.created_at",
            SortField::UpdatedAt => "t.updated_at",
            SortField::CreatorId => "t.creator_id",
            SortField::AssignedToId => "t.assigned_to_id",
        }
    }

    /// Ascending comparison. A missing assignee sorts after every assigned task,
    /// matching Postgres' NULLS LAST default for ascending order.
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Description => a.description.cmp(&b.description),
            SortField::DueDate => a.due_date.cmp(&b.due_date),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Status => a.status.cmp(&b.status),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::CreatorId => a.creator_id.cmp(&b.creator_id),
            SortField::AssignedToId => match (a.assigned_to_id, b.assigned_to_id) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query parameters for listing tasks. Every filter is optional; present filters are
/// combined with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to_id: Option<Uuid>,
    pub creator_id: Option<Uuid>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
}

/// Store-level task selection: the public filters plus the per-user projections
/// (assigned, created, overdue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to_id: Option<Uuid>,
    pub creator_id: Option<Uuid>,
    /// Tasks where this user is creator or assignee.
    pub involving: Option<Uuid>,
    /// Only tasks due strictly before this instant.
    pub due_before: Option<DateTime<Utc>>,
    pub exclude_status: Option<TaskStatus>,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            assigned_to_id: None,
            creator_id: None,
            involving: None,
            due_before: None,
            exclude_status: None,
            sort_by: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl From<TaskFilters> for TaskQuery {
    fn from(filters: TaskFilters) -> Self {
        // Without sortBy the listing is newest first; with it, order defaults to ascending.
        let (sort_by, order) = match filters.sort_by {
            Some(field) => (field, filters.order.unwrap_or(SortOrder::Asc)),
            None => (SortField::CreatedAt, SortOrder::Desc),
        };
        Self {
            status: filters.status,
            priority: filters.priority,
            assigned_to_id: filters.assigned_to_id,
            creator_id: filters.creator_id,
            sort_by,
            order,
            ..Self::default()
        }
    }
}

impl TaskQuery {
    pub fn assigned_to(user_id: Uuid) -> Self {
        Self {
            assigned_to_id: Some(user_id),
            sort_by: SortField::DueDate,
            order: SortOrder::Asc,
            ..Self::default()
        }
    }

    pub fn created_by(user_id: Uuid) -> Self {
        Self {
            creator_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn overdue_for(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            involving: Some(user_id),
            due_before: Some(now),
            exclude_status: Some(TaskStatus::Completed),
            sort_by: SortField::DueDate,
            order: SortOrder::Asc,
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self
                .assigned_to_id
                .map_or(true, |id| task.assigned_to_id == Some(id))
            && self.creator_id.map_or(true, |id| task.creator_id == id)
            && self
                .involving
                .map_or(true, |id| task.is_creator(id) || task.is_assignee(id))
            && self.due_before.map_or(true, |at| task.due_date < at)
            && self.exclude_status.map_or(true, |s| task.status != s)
    }

    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| {
            let ordering = self.sort_by.compare(a, b);
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

/// Counts for one user. `total` counts each task once even when the user is both
/// creator and assignee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskStats {
    pub total: i64,
    pub assigned: i64,
    pub created: i64,
    pub overdue: i64,
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::payload(field, "Invalid date format"))
}

fn invalid(code: &'static str, message: &'static str) -> FieldError {
    let mut err = FieldError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_timestamp(raw: &str) -> Result<(), FieldError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|_| ())
        .map_err(|_| invalid("datetime", "Invalid date format"))
}

fn validate_title_patch(title: &Patch<String>) -> Result<(), FieldError> {
    match title {
        Patch::Absent => Ok(()),
        Patch::Clear => Err(invalid("null", "Title must not be null")),
        Patch::Set(value) => {
            let chars = value.chars().count();
            if (1..=TITLE_MAX_CHARS).contains(&chars) {
                Ok(())
            } else {
                Err(invalid(
                    "length",
                    "Title must be between 1 and 100 characters",
                ))
            }
        }
    }
}

fn validate_present_text(value: &Patch<String>) -> Result<(), FieldError> {
    reject_null(value)
}

fn validate_timestamp_patch(value: &Patch<String>) -> Result<(), FieldError> {
    match value {
        Patch::Set(raw) => validate_timestamp(raw),
        other => reject_null(other),
    }
}

fn validate_present_priority(value: &Patch<TaskPriority>) -> Result<(), FieldError> {
    reject_null(value)
}

fn validate_present_status(value: &Patch<TaskStatus>) -> Result<(), FieldError> {
    reject_null(value)
}

fn reject_null<T>(value: &Patch<T>) -> Result<(), FieldError> {
    if value.is_clear() {
        Err(invalid("null", "Value must not be null"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn summary(id: Uuid) -> UserSummary {
        UserSummary {
            id,
            name: "User".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    fn task(status: TaskStatus, due_in: Duration) -> Task {
        let creator = Uuid::new_v4();
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Test Task".to_string(),
            description: "Test description".to_string(),
            due_date: now + due_in,
            priority: TaskPriority::High,
            status,
            creator_id: creator,
            assigned_to_id: None,
            created_at: now,
            updated_at: now,
            creator: summary(creator),
            assigned_to: None,
        }
    }

    fn create_request(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: "Test description".to_string(),
            due_date: "2030-01-01T10:00:00Z".to_string(),
            priority: TaskPriority::High,
            assigned_to_id: None,
        }
    }

    #[test]
    fn test_overdue_is_derived_from_due_date_and_status() {
        assert!(task(TaskStatus::Todo, Duration::days(-1)).is_overdue());
        assert!(task(TaskStatus::Review, Duration::days(-1)).is_overdue());
        assert!(!task(TaskStatus::Completed, Duration::days(-1)).is_overdue());
        assert!(!task(TaskStatus::Todo, Duration::days(1)).is_overdue());
    }

    #[test]
    fn test_permissions() {
        let mut t = task(TaskStatus::Todo, Duration::days(1));
        let assignee = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        t.assigned_to_id = Some(assignee);

        assert!(t.can_update(t.creator_id));
        assert!(t.can_update(assignee));
        assert!(!t.can_update(stranger));
        assert!(t.can_delete(t.creator_id));
        assert!(!t.can_delete(assignee));
    }

    #[test]
    fn test_create_request_title_bounds() {
        assert!(create_request("a").validate().is_ok());
        assert!(create_request(&"a".repeat(100)).validate().is_ok());
        // Length is counted in characters, not bytes.
        assert!(create_request(&"é".repeat(100)).validate().is_ok());

        let err = create_request("").into_new_task(Uuid::new_v4()).unwrap_err();
        assert!(err.has_field("title"));
        let err = create_request(&"a".repeat(101))
            .into_new_task(Uuid::new_v4())
            .unwrap_err();
        assert!(err.has_field("title"));
    }

    #[test]
    fn test_create_request_due_date_must_parse() {
        let mut request = create_request("Valid");
        request.due_date = "next tuesday".to_string();
        let err = request.into_new_task(Uuid::new_v4()).unwrap_err();
        assert!(err.has_field("dueDate"));
    }

    #[test]
    fn test_create_request_wire_format() {
        let request: CreateTaskRequest = serde_json::from_value(json!({
            "title": "Test Task",
            "description": "Test description",
            "dueDate": "2030-01-01T10:00:00.000Z",
            "priority": "URGENT"
        }))
        .unwrap();
        assert_eq!(request.priority, TaskPriority::Urgent);
        assert!(request.assigned_to_id.is_none());

        let bad_priority = serde_json::from_value::<CreateTaskRequest>(json!({
            "title": "Test Task",
            "description": "Test description",
            "dueDate": "2030-01-01T10:00:00Z",
            "priority": "CRITICAL"
        }));
        assert!(bad_priority.is_err());
    }

    #[test]
    fn test_update_request_patch_semantics() {
        let request: UpdateTaskRequest =
            serde_json::from_value(json!({ "status": "IN_PROGRESS", "assignedToId": null }))
                .unwrap();
        let changes = request.into_changes().unwrap();
        assert_eq!(changes.status, Some(TaskStatus::InProgress));
        assert_eq!(changes.assigned_to_id, Patch::Clear);
        assert!(changes.title.is_none());

        let empty: UpdateTaskRequest = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_changes().unwrap().is_empty());
    }

    #[test]
    fn test_update_request_rejects_null_title_and_bad_values() {
        let null_title: UpdateTaskRequest =
            serde_json::from_value(json!({ "title": null })).unwrap();
        assert!(null_title.into_changes().unwrap_err().has_field("title"));

        let long_title: UpdateTaskRequest =
            serde_json::from_value(json!({ "title": "x".repeat(101) })).unwrap();
        assert!(long_title.into_changes().unwrap_err().has_field("title"));

        let bad_date: UpdateTaskRequest =
            serde_json::from_value(json!({ "dueDate": "yesterday" })).unwrap();
        assert!(bad_date.into_changes().unwrap_err().has_field("dueDate"));

        let null_status: UpdateTaskRequest =
            serde_json::from_value(json!({ "status": null })).unwrap();
        assert!(null_status.into_changes().unwrap_err().has_field("status"));
    }

    #[test]
    fn test_filters_default_sort() {
        let query = TaskQuery::from(TaskFilters::default());
        assert_eq!(query.sort_by, SortField::CreatedAt);
        assert_eq!(query.order, SortOrder::Desc);

        let query = TaskQuery::from(TaskFilters {
            sort_by: Some(SortField::Priority),
            ..TaskFilters::default()
        });
        assert_eq!(query.sort_by, SortField::Priority);
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn test_query_sort_by_priority_desc() {
        let mut low = task(TaskStatus::Todo, Duration::days(1));
        low.priority = TaskPriority::Low;
        let mut urgent = task(TaskStatus::Todo, Duration::days(1));
        urgent.priority = TaskPriority::Urgent;
        let medium = {
            let mut t = task(TaskStatus::Todo, Duration::days(1));
            t.priority = TaskPriority::Medium;
            t
        };

        let query = TaskQuery {
            sort_by: SortField::Priority,
            order: SortOrder::Desc,
            ..TaskQuery::default()
        };
        let mut tasks = vec![low, urgent, medium];
        query.sort(&mut tasks);
        let priorities: Vec<_> = tasks.iter().map(|t| t.priority).collect();
        assert_eq!(
            priorities,
            vec![TaskPriority::Urgent, TaskPriority::Medium, TaskPriority::Low]
        );
    }

    #[test]
    fn test_overdue_query_matches() {
        let now = Utc::now();
        let late = task(TaskStatus::Todo, Duration::days(-1));
        let user = late.creator_id;
        let query = TaskQuery::overdue_for(user, now);
        assert!(query.matches(&late));

        let mut done = late.clone();
        done.status = TaskStatus::Completed;
        assert!(!query.matches(&done));

        assert!(!TaskQuery::overdue_for(Uuid::new_v4(), now).matches(&late));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            json!("IN_PROGRESS")
        );
        assert_eq!(serde_json::to_value(TaskPriority::Low).unwrap(), json!("LOW"));
        assert_eq!(
            serde_json::to_value(SortField::AssignedToId).unwrap(),
            json!("assignedToId")
        );
    }
}
