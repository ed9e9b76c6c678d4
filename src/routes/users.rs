use actix_web::{get, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::ApiResponse;
use crate::services::{AuthService, TaskService};

#[get("")]
pub async fn list_users(
    auth: web::Data<AuthService>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let users = auth.list_users().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "users": users }))))
}

#[get("/me/tasks")]
pub async fn get_my_tasks(
    tasks: web::Data<TaskService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let tasks = tasks.get_my_assigned_tasks(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "tasks": tasks }))))
}

#[get("/me/created")]
pub async fn get_my_created_tasks(
    tasks: web::Data<TaskService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let tasks = tasks.get_my_created_tasks(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "tasks": tasks }))))
}

#[get("/{id}")]
pub async fn get_user(
    auth: web::Data<AuthService>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = auth.get_user_by_id(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "user": user }))))
}
