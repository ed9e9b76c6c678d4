#![doc = "The `taskhub` library crate."]
#![doc = ""]
#![doc = "Accounts, tasks and realtime task notifications. The binary (`main.rs`) builds an"]
#![doc = "[`state::AppState`] from the environment and serves it with actix-web."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;
