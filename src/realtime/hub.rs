use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::events::ServerMessage;
use crate::models::Task;

pub type ConnectionId = u64;

/// Fan-out contract for task lifecycle events.
///
/// Delivery is at-most-once. Nothing is acknowledged or replayed, and events carry no
/// ordering guarantee relative to each other.
pub trait TaskNotifier: Send + Sync {
    /// Sent to every connection.
    fn task_created(&self, task: &Task);
    /// Sent to every connection.
    fn task_updated(&self, task: &Task);
    /// Sent to every connection.
    fn task_deleted(&self, task_id: Uuid);
    /// Sent to the room of the task's assignee only.
    fn task_assigned(&self, task: &Task);
}

/// Connection registry and user rooms for the realtime channel.
///
/// Each connection owns a bounded outbound queue. A frame is dropped for a connection
/// whose queue is full or closed; other connections are unaffected.
pub struct NotificationHub {
    connections: DashMap<ConnectionId, mpsc::Sender<String>>,
    rooms: DashMap<Uuid, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<Uuid>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl NotificationHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            memberships: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Registers a connection. Dropping the returned [`Connection`] unregisters it and
    /// removes it from every room.
    pub fn connect(self: &Arc<Self>) -> (Connection, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.connections.insert(id, tx);
        log::debug!("Realtime connection {} registered", id);
        (
            Connection {
                id,
                hub: Arc::clone(self),
            },
            rx,
        )
    }

    pub fn join(&self, connection: ConnectionId, user_id: Uuid) {
        if !self.connections.contains_key(&connection) {
            return;
        }
        self.rooms.entry(user_id).or_default().insert(connection);
        self.memberships
            .entry(connection)
            .or_default()
            .insert(user_id);
        log::debug!("Realtime connection {} joined room {}", connection, user_id);
    }

    fn disconnect(&self, connection: ConnectionId) {
        self.connections.remove(&connection);
        let Some((_, rooms)) = self.memberships.remove(&connection) else {
            return;
        };
        for room in rooms {
            if let Some(mut members) = self.rooms.get_mut(&room) {
                members.remove(&connection);
            }
            self.rooms.remove_if(&room, |_, members| members.is_empty());
        }
        log::debug!("Realtime connection {} removed", connection);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_size(&self, user_id: Uuid) -> usize {
        self.rooms.get(&user_id).map_or(0, |members| members.len())
    }

    /// Queues `message` for every connection.
    pub fn broadcast(&self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        for entry in self.connections.iter() {
            deliver(*entry.key(), entry.value(), frame.clone());
        }
    }

    /// Queues `message` for every connection in `user_id`'s room.
    pub fn send_to_room(&self, user_id: Uuid, message: &ServerMessage) {
        let members: Vec<ConnectionId> = match self.rooms.get(&user_id) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };
        let Some(frame) = encode(message) else {
            return;
        };
        for id in members {
            if let Some(sender) = self.connections.get(&id) {
                deliver(id, sender.value(), frame.clone());
            }
        }
    }

    /// Queues `message` for a single connection.
    pub fn send_to(&self, connection: ConnectionId, message: &ServerMessage) {
        if let (Some(sender), Some(frame)) = (self.connections.get(&connection), encode(message)) {
            deliver(connection, sender.value(), frame);
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match message.to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            log::error!("Failed to encode realtime frame: {}", e);
            None
        }
    }
}

fn deliver(id: ConnectionId, sender: &mpsc::Sender<String>, frame: String) {
    match sender.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            log::debug!("Realtime connection {} is lagging, frame dropped", id)
        }
        Err(TrySendError::Closed(_)) => {
            log::debug!("Realtime connection {} is closed, frame dropped", id)
        }
    }
}

impl TaskNotifier for NotificationHub {
    fn task_created(&self, task: &Task) {
        self.broadcast(&ServerMessage::TaskCreated(task.clone()));
    }

    fn task_updated(&self, task: &Task) {
        self.broadcast(&ServerMessage::TaskUpdated(task.clone()));
    }

    fn task_deleted(&self, task_id: Uuid) {
        self.broadcast(&ServerMessage::TaskDeleted { id: task_id });
    }

    fn task_assigned(&self, task: &Task) {
        if let Some(assignee) = task.assigned_to_id {
            self.send_to_room(assignee, &ServerMessage::TaskAssigned(task.clone()));
        }
    }
}

/// A registered realtime connection. Leaves every room when dropped.
pub struct Connection {
    id: ConnectionId,
    hub: Arc<NotificationHub>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn join(&self, user_id: Uuid) {
        self.hub.join(self.id, user_id);
    }

    pub fn send(&self, message: &ServerMessage) {
        self.hub.send_to(self.id, message);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}
