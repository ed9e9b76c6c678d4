//! Realtime push of task events over a websocket.

pub mod events;
pub mod hub;
pub mod session;

pub use events::{ClientMessage, ServerMessage};
pub use hub::{Connection, ConnectionId, NotificationHub, TaskNotifier};
pub use session::realtime;
