use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{StoreError, TaskStore, UserStore};
use crate::models::{
    NewTask, NewUser, Patch, Task, TaskChanges, TaskPriority, TaskQuery, TaskStats, TaskStatus,
    User, UserRecord, UserSummary,
};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.due_date, t.priority, t.status, \
     t.creator_id, t.assigned_to_id, t.created_at, t.updated_at, \
     c.name AS creator_name, c.email AS creator_email, \
     a.name AS assignee_name, a.email AS assignee_email";

const USER_JOINS: &str =
    "JOIN users c ON c.id = t.creator_id LEFT JOIN users a ON a.id = t.assigned_to_id";

/// A task row joined with its creator and (optional) assignee.
#[derive(Debug, FromRow)]
struct TaskRow {
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
    creator_name: String,
    creator_email: String,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let assigned_to = match (row.assigned_to_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };
        Task {
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            priority: row.priority,
            status: row.status,
            creator_id: row.creator_id,
            assigned_to_id: row.assigned_to_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            creator: UserSummary {
                id: row.creator_id,
                name: row.creator_name,
                email: row.creator_email,
            },
            assigned_to,
        }
    }
}

/// PostgreSQL-backed store for users and tasks.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps constraint violations onto their store-level meaning.
fn classify(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        match db.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation(constraint),
            Some("23503") => return StoreError::ForeignKeyViolation(constraint),
            _ => {}
        }
    }
    StoreError::Database(error)
}

fn select_tasks() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT {} FROM tasks t {}", TASK_COLUMNS, USER_JOINS))
}

/// Wraps a data-modifying statement (already pushed into `qb`, ending in `RETURNING *`)
/// so the result comes back joined like any other task read.
fn select_from_cte(qb: &mut QueryBuilder<'_, Postgres>) {
    qb.push(format!(") SELECT {} FROM t {}", TASK_COLUMNS, USER_JOINS));
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let record = user.into_record();
        sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(record.id)
        .bind(&record.email)
        .bind(&record.name)
        .bind(&record.password_hash)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at, updated_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let mut qb = QueryBuilder::<Postgres>::new(
            "WITH t AS (INSERT INTO tasks \
             (id, title, description, due_date, priority, status, creator_id, assigned_to_id, \
              created_at, updated_at) VALUES (",
        );
        qb.separated(", ")
            .push_bind(Uuid::new_v4())
            .push_bind(task.title)
            .push_bind(task.description)
            .push_bind(task.due_date)
            .push_bind(task.priority)
            .push_bind(TaskStatus::Todo)
            .push_bind(task.creator_id)
            .push_bind(task.assigned_to_id)
            .push_bind(now)
            .push_bind(now);
        qb.push(") RETURNING *");
        select_from_cte(&mut qb);

        qb.build_query_as::<TaskRow>()
            .fetch_one(&self.pool)
            .await
            .map(Task::from)
            .map_err(classify)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut qb = select_tasks();
        qb.push(" WHERE t.id = ").push_bind(id);
        let row = qb
            .build_query_as::<TaskRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(row.map(Task::from))
    }

    async fn find_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let mut qb = select_tasks();
        qb.push(" WHERE TRUE");
        if let Some(status) = query.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = query.priority {
            qb.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(assignee) = query.assigned_to_id {
            qb.push(" AND t.assigned_to_id = ").push_bind(assignee);
        }
        if let Some(creator) = query.creator_id {
            qb.push(" AND t.creator_id = ").push_bind(creator);
        }
        if let Some(user) = query.involving {
            qb.push(" AND (t.creator_id = ")
                .push_bind(user)
                .push(" OR t.assigned_to_id = ")
                .push_bind(user)
                .push(")");
        }
        if let Some(at) = query.due_before {
            qb.push(" AND t.due_date < ").push_bind(at);
        }
        if let Some(status) = query.exclude_status {
            qb.push(" AND t.status <> ").push_bind(status);
        }
        // Column and direction come from closed enums, never from raw input.
        qb.push(" ORDER BY ")
            .push(query.sort_by.column())
            .push(" ")
            .push(query.order.keyword());

        let rows = qb
            .build_query_as::<TaskRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("WITH t AS (UPDATE tasks SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(title) = changes.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(due_date) = changes.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(priority) = changes.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status);
        }
        match changes.assigned_to_id {
            Patch::Absent => {}
            Patch::Clear => {
                qb.push(", assigned_to_id = NULL");
            }
            Patch::Set(assignee) => {
                qb.push(", assigned_to_id = ").push_bind(assignee);
            }
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        select_from_cte(&mut qb);

        let row = qb
            .build_query_as::<TaskRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(row.map(Task::from))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn task_stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<TaskStats, StoreError> {
        sqlx::query_as::<_, TaskStats>(
            "SELECT \
                 COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE assigned_to_id = $1) AS assigned, \
                 COUNT(*) FILTER (WHERE creator_id = $1) AS created, \
                 COUNT(*) FILTER (WHERE due_date < $2 AND status <> 'COMPLETED') AS overdue \
             FROM tasks \
             WHERE creator_id = $1 OR assigned_to_id = $1",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }
}
