use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{ApiResponse, CreateTaskRequest, TaskFilters, UpdateTaskRequest};
use crate::realtime::TaskNotifier;
use crate::services::TaskService;

/// List tasks
///
/// Supports `status`, `priority`, `assignedToId`, `creatorId`, `sortBy` and `order`.
#[get("")]
pub async fn get_tasks(
    tasks: web::Data<TaskService>,
    _user: AuthenticatedUser,
    filters: web::Query<TaskFilters>,
) -> Result<HttpResponse, AppError> {
    let tasks = tasks.get_tasks(filters.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "tasks": tasks }))))
}

/// Create a task owned by the caller.
#[post("")]
pub async fn create_task(
    tasks: web::Data<TaskService>,
    notifier: web::Data<dyn TaskNotifier>,
    user: AuthenticatedUser,
    body: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let task = tasks.create_task(body.into_inner(), user.0.id).await?;
    notifier.task_created(&task);
    if task.assigned_to_id.is_some() {
        notifier.task_assigned(&task);
    }
    Ok(HttpResponse::Created().json(ApiResponse::ok(json!({ "task": task }))))
}

#[get("/stats")]
pub async fn get_task_stats(
    tasks: web::Data<TaskService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let stats = tasks.get_task_stats(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "stats": stats }))))
}

#[get("/assigned")]
pub async fn get_assigned_tasks(
    tasks: web::Data<TaskService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let tasks = tasks.get_my_assigned_tasks(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "tasks": tasks }))))
}

#[get("/created")]
pub async fn get_created_tasks(
    tasks: web::Data<TaskService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let tasks = tasks.get_my_created_tasks(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "tasks": tasks }))))
}

#[get("/overdue")]
pub async fn get_overdue_tasks(
    tasks: web::Data<TaskService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let tasks = tasks.get_overdue_tasks(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "tasks": tasks }))))
}

#[get("/{id}")]
pub async fn get_task(
    tasks: web::Data<TaskService>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let task = tasks.get_task_by_id(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "task": task }))))
}

/// Partially update a task
///
/// Allowed for the creator and the current assignee. A change of assignee is also
/// pushed to the new assignee's room.
#[patch("/{id}")]
pub async fn update_task(
    tasks: web::Data<TaskService>,
    notifier: web::Data<dyn TaskNotifier>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = tasks
        .update_task(id.into_inner(), body.into_inner(), user.0.id)
        .await?;
    notifier.task_updated(&outcome.task);
    if outcome.new_assignee().is_some() {
        notifier.task_assigned(&outcome.task);
    }
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "task": outcome.task }))))
}

/// Delete a task. Creator only.
#[delete("/{id}")]
pub async fn delete_task(
    tasks: web::Data<TaskService>,
    notifier: web::Data<dyn TaskNotifier>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let deleted = tasks.delete_task(id.into_inner(), user.0.id).await?;
    notifier.task_deleted(deleted.id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "message": "Task deleted" }))))
}
