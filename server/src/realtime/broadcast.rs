//! Emission interface used by route handlers.

use axum::extract::ws::Message;
use serde_json::Value;

use super::protocol::ServerFrame;
use super::rooms::{conversation_room, user_room};
use super::Realtime;

impl Realtime {
    /// Send an event to one connection. Returns false if it is gone.
    pub fn send_to_connection(&self, connection_id: &str, event: &str, data: Value) -> bool {
        let Some(tx) = self.sender(connection_id) else {
            return false;
        };
        match ServerFrame::new(event, data).to_message() {
            Some(msg) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Send an event to every connection in `room`. Returns how many were reached.
    pub fn emit_to_room(&self, room: &str, event: &str, data: Value) -> usize {
        let members = self.rooms().members(room);
        if members.is_empty() {
            return 0;
        }

        let Some(msg) = ServerFrame::new(event, data).to_message() else {
            return 0;
        };

        let delivered = members
            .iter()
            .filter_map(|connection_id| self.sender(connection_id))
            .filter(|tx| tx.send(msg.clone()).is_ok())
            .count();

        tracing::debug!(room = %room, event = %event, delivered, "Emitted realtime event");
        delivered
    }

    /// Direct notification to `user-{id}`.
    pub fn emit_to_user(&self, user_id: &str, event: &str, data: Value) -> usize {
        self.emit_to_room(&user_room(user_id), event, data)
    }

    /// Shared update to `conversation-{id}`.
    pub fn emit_to_conversation(&self, conversation_id: &str, event: &str, data: Value) -> usize {
        self.emit_to_room(&conversation_room(conversation_id), event, data)
    }

    /// Close every tracked connection (used at shutdown).
    pub fn close_all(&self, reason: &str) {
        let frame = axum::extract::ws::CloseFrame {
            code: 1001,
            reason: reason.into(),
        };
        for connection_id in self.connection_ids() {
            if let Some(tx) = self.sender(&connection_id) {
                let _ = tx.send(Message::Close(Some(frame.clone())));
            }
        }
    }
}
