use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Task;

/// Frames pushed to realtime clients, encoded as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "task:created")]
    TaskCreated(Task),
    #[serde(rename = "task:updated")]
    TaskUpdated(Task),
    #[serde(rename = "task:deleted")]
    TaskDeleted { id: Uuid },
    #[serde(rename = "task:assigned")]
    TaskAssigned(Task),
    #[serde(rename = "authenticated")]
    Authenticated {
        #[serde(rename = "userId")]
        user_id: Uuid,
    },
    #[serde(rename = "auth_error")]
    AuthError { message: String },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frames accepted from realtime clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Join the room of a user id, unauthenticated.
    Join(Uuid),
    /// Join the room of the identity inside a session token.
    Authenticate(String),
}
