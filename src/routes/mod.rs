pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Registers every `/api` endpoint. Expected to be mounted under a `/api` scope wrapped
/// by [`AuthMiddleware`](crate::auth::AuthMiddleware).
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::logout)
                .service(auth::me),
        )
        .service(
            // Fixed segments first so they are not captured by `/{id}`.
            web::scope("/tasks")
                .service(tasks::get_task_stats)
                .service(tasks::get_assigned_tasks)
                .service(tasks::get_created_tasks)
                .service(tasks::get_overdue_tasks)
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        )
        .service(
            web::scope("/users")
                .service(users::list_users)
                .service(users::get_my_tasks)
                .service(users::get_my_created_tasks)
                .service(users::get_user),
        );
}
