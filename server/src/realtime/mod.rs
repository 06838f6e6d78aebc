//! Realtime layer: WebSocket connections, rooms, and user presence.
//!
//! All state lives in a [`Realtime`] value owned by the server state, so
//! every server instance (and every test) gets its own.

pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod presence;
pub mod protocol;
pub mod rooms;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use presence::{JoinOutcome, PresenceMap};
use rooms::{user_room, RoomRegistry};

/// Identifier assigned to each WebSocket connection on upgrade.
pub type ConnectionId = String;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

#[derive(Debug, Default)]
pub struct Realtime {
    connections: DashMap<ConnectionId, ConnectionSender>,
    rooms: RoomRegistry,
    presence: PresenceMap,
}

impl Realtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presence(&self) -> &PresenceMap {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Track a new connection and return its id.
    pub fn connect(&self, tx: ConnectionSender) -> ConnectionId {
        let connection_id = Uuid::now_v7().to_string();
        self.connections.insert(connection_id.clone(), tx);
        connection_id
    }

    /// Forget a connection: drop its sender, leave its rooms, and remove
    /// the first presence entry pointing at it. Returns that entry's user id.
    pub fn disconnect(&self, connection_id: &str) -> Option<String> {
        self.connections.remove(connection_id);
        self.rooms.leave_all(connection_id);
        self.presence.remove_by_connection(connection_id)
    }

    /// Register `user_id` on this connection and join its user room.
    pub fn join_user_room(&self, connection_id: &str, user_id: &str) -> JoinOutcome {
        let outcome = self.presence.register(user_id, connection_id);
        if outcome != JoinOutcome::AlreadyRegistered {
            self.rooms.join(&user_room(user_id), connection_id);
        }
        outcome
    }

    pub fn join_room(&self, connection_id: &str, room: &str) -> bool {
        self.rooms.join(room, connection_id)
    }

    pub fn leave_room(&self, connection_id: &str, room: &str) -> bool {
        self.rooms.leave(room, connection_id)
    }

    pub(crate) fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub(crate) fn sender(&self, connection_id: &str) -> Option<ConnectionSender> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.value().clone())
    }
}
