//!
//! # Error Handling
//!
//! The service layer reports failures through a small taxonomy:
//!
//! * [`ValidationError`] for malformed or out-of-range input, with field-level details.
//! * [`AuthError`] for credential, token and registration failures.
//! * [`TaskError`] for task business rules (missing task, forbidden action, unknown assignee).
//!
//! [`AppError`] wraps all of them plus unexpected failures. It implements
//! `actix_web::error::ResponseError`, so handlers return `Result<_, AppError>` and the
//! boundary renders the standard `{ success, data?, error? }` envelope. Unexpected errors
//! are logged and surfaced as a generic `INTERNAL_ERROR` without leaking their detail.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::borrow::Cow;
use validator::ValidationErrors;

use crate::models::ApiResponse;
use crate::store::StoreError;

/// One failed field in a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Wire (camelCase) name of the offending field.
    pub field: String,
    pub code: String,
    pub message: String,
}

/// Input failed shape or range checks. Recoverable by resubmitting corrected input.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub details: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, details: Vec<FieldIssue>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    /// A validation error that is not tied to a specific field, e.g. an unparseable body.
    pub fn payload(field: &str, reason: impl Into<String>) -> Self {
        Self::new(
            "Validation error",
            vec![FieldIssue {
                field: field.to_string(),
                code: "invalid".to_string(),
                message: reason.into(),
            }],
        )
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.details.iter().any(|d| d.field == field)
    }
}

impl From<ValidationErrors> for ValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldIssue> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| FieldIssue {
                    field: camel_case(field),
                    code: err.code.to_string(),
                    message: err
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(format!("Invalid value ({})", err.code)))
                        .into_owned(),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        Self::new("Validation failed", details)
    }
}

/// Authentication and registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,
    /// Shared by "no such user" and "wrong password".
    #[error("Invalid email or password")]
    InvalidCredential,
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("User not found")]
    UserNotFound,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredential
            | AuthError::MissingToken
            | AuthError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// Task business-rule failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,
    /// `action` is the denied verb, e.g. "update" or "delete".
    #[error("Not authorized to {action} this task")]
    Forbidden { action: &'static str },
    #[error("Assigned user not found")]
    AssigneeNotFound,
}

impl TaskError {
    pub fn status(&self) -> StatusCode {
        match self {
            TaskError::NotFound => StatusCode::NOT_FOUND,
            TaskError::Forbidden { .. } => StatusCode::FORBIDDEN,
            TaskError::AssigneeNotFound => StatusCode::BAD_REQUEST,
        }
    }
}

/// Every failure a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Task(#[from] TaskError),
    /// Errors originating from the persistence layer that have no business meaning.
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Envelope `code` for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(err) => {
                let status = err.status();
                if status == StatusCode::UNAUTHORIZED {
                    "UNAUTHORIZED"
                } else if status == StatusCode::NOT_FOUND {
                    "NOT_FOUND"
                } else {
                    "AUTH_ERROR"
                }
            }
            AppError::Task(err) => match err {
                TaskError::NotFound => "NOT_FOUND",
                TaskError::Forbidden { .. } => "FORBIDDEN",
                TaskError::AssigneeNotFound => "TASK_ERROR",
            },
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(err) => err.status(),
            AppError::Task(err) => err.status(),
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(err) => {
                ApiResponse::failure(&err.message, self.code(), Some(err.details.as_slice()))
            }
            AppError::Auth(err) => ApiResponse::failure(&err.to_string(), self.code(), None),
            AppError::Task(err) => ApiResponse::failure(&err.to_string(), self.code(), None),
            // Internal detail stays in the log.
            AppError::Database(_) | AppError::Internal(_) => {
                log::error!("{}", self);
                ApiResponse::failure("Internal server error", self.code(), None)
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::UniqueViolation(_) => AppError::Auth(AuthError::DuplicateEmail),
            StoreError::ForeignKeyViolation(_) => AppError::Task(TaskError::AssigneeNotFound),
            StoreError::Database(err) => AppError::Database(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        AppError::Validation(errors.into())
    }
}

/// Hashing or verification failures are never the caller's fault.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(format!("password hashing failed: {}", error))
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
