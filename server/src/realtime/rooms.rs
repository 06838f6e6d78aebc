use dashmap::DashMap;
use std::collections::HashSet;

use super::ConnectionId;

/// Room carrying direct notifications for one user.
pub fn user_room(user_id: &str) -> String {
    format!("user-{}", user_id)
}

/// Room carrying shared updates for one conversation.
pub fn conversation_room(conversation_id: &str) -> String {
    format!("conversation-{}", conversation_id)
}

/// Named broadcast groups of connections. Empty rooms are dropped.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns false if it was already a member.
    pub fn join(&self, room: &str, connection_id: &str) -> bool {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection_id.to_string())
    }

    /// Remove a connection from a room. Returns false if it was not a member.
    pub fn leave(&self, room: &str, connection_id: &str) -> bool {
        let mut removed = false;
        let mut now_empty = false;

        if let Some(mut members) = self.rooms.get_mut(room) {
            removed = members.remove(connection_id);
            now_empty = members.is_empty();
        }

        if now_empty {
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }

        removed
    }

    /// Remove a connection from every room it joined.
    pub fn leave_all(&self, connection_id: &str) {
        self.rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    pub fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &str, connection_id: &str) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(connection_id))
            .unwrap_or(false)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
