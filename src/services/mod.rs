//! Business rules for accounts and tasks, independent of the HTTP layer.

pub mod auth;
pub mod tasks;

pub use auth::{AuthService, LoginOutcome};
pub use tasks::{TaskService, UpdateOutcome};
