use actix_web::{error, web, HttpRequest};
use std::sync::Arc;

use crate::auth::{AuthMiddleware, TokenIssuer};
use crate::config::Config;
use crate::error::{AppError, ValidationError};
use crate::realtime::{self, NotificationHub, TaskNotifier};
use crate::routes;
use crate::services::{AuthService, TaskService};
use crate::store::{MemoryStore, TaskStore, UserStore};

/// Everything a worker needs, built once at startup and cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenIssuer>,
    pub auth: AuthService,
    pub tasks: TaskService,
    pub hub: Arc<NotificationHub>,
}

impl AppState {
    pub fn new<S>(config: Config, store: Arc<S>) -> Self
    where
        S: UserStore + TaskStore + 'static,
    {
        let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret, config.token_ttl_days));
        let users: Arc<dyn UserStore> = store.clone();
        let tasks: Arc<dyn TaskStore> = store;
        Self {
            auth: AuthService::new(users.clone(), tokens.clone(), config.bcrypt_cost),
            tasks: TaskService::new(tasks, users),
            hub: Arc::new(NotificationHub::new(config.realtime_buffer)),
            tokens,
            config,
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    /// Registers shared data, extractor error handlers, the `/api` scope and `/ws`.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let notifier: Arc<dyn TaskNotifier> = self.hub.clone();
        cfg.app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::from(self.tokens.clone()))
            .app_data(web::Data::new(self.auth.clone()))
            .app_data(web::Data::new(self.tasks.clone()))
            .app_data(web::Data::from(self.hub.clone()))
            .app_data(web::Data::from(notifier))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
            .service(realtime::realtime);
    }
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(ValidationError::payload("body", err.to_string())).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(ValidationError::payload("query", err.to_string())).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(ValidationError::payload("path", err.to_string())).into()
}
