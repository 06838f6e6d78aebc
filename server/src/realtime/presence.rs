//! Presence map: which connection currently speaks for each user.
//!
//! One entry per user id, last write wins. A reconnect overwrites the old
//! connection id; the old connection is not closed.

use dashmap::DashMap;

use super::ConnectionId;

/// Outcome of registering a user on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user had no live connection.
    Registered,
    /// The user was mapped to another connection, now superseded.
    Reconnected { previous: ConnectionId },
    /// The user was already mapped to this connection.
    AlreadyRegistered,
}

#[derive(Debug, Default)]
pub struct PresenceMap {
    entries: DashMap<String, ConnectionId>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `user_id` to `connection_id`, superseding any previous connection.
    pub fn register(&self, user_id: &str, connection_id: &str) -> JoinOutcome {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get() == connection_id {
                    JoinOutcome::AlreadyRegistered
                } else {
                    let previous = entry.insert(connection_id.to_string());
                    JoinOutcome::Reconnected { previous }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(connection_id.to_string());
                JoinOutcome::Registered
            }
        }
    }

    /// Remove the first entry mapped to `connection_id`, returning its user id.
    ///
    /// Only one entry is removed even if several users share the connection
    /// id. Correct clients never produce that state; it is not prevented.
    pub fn remove_by_connection(&self, connection_id: &str) -> Option<String> {
        // Collect the key first; the iterator holds shard locks until dropped.
        let user_id = self
            .entries
            .iter()
            .find(|entry| entry.value() == connection_id)
            .map(|entry| entry.key().clone())?;

        self.entries
            .remove_if(&user_id, |_, conn| conn == connection_id)
            .map(|(user_id, _)| user_id)
    }

    pub fn connection_for(&self, user_id: &str) -> Option<ConnectionId> {
        self.entries.get(user_id).map(|entry| entry.value().clone())
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn online_users(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_join_registers() {
        let presence = PresenceMap::new();
        assert_eq!(presence.register("u1", "c1"), JoinOutcome::Registered);
        assert_eq!(presence.connection_for("u1").as_deref(), Some("c1"));
    }

    #[test]
    fn same_connection_join_is_noop() {
        let presence = PresenceMap::new();
        presence.register("u1", "c1");
        assert_eq!(presence.register("u1", "c1"), JoinOutcome::AlreadyRegistered);
        assert_eq!(presence.len(), 1);
    }

    #[test]
    fn reconnect_leaves_single_mapping_to_newest_connection() {
        let presence = PresenceMap::new();
        presence.register("u1", "c1");
        assert_eq!(
            presence.register("u1", "c2"),
            JoinOutcome::Reconnected {
                previous: "c1".to_string()
            }
        );
        assert_eq!(presence.len(), 1);
        assert_eq!(presence.connection_for("u1").as_deref(), Some("c2"));
    }

    #[test]
    fn stale_connection_disconnect_keeps_reconnected_user() {
        let presence = PresenceMap::new();
        presence.register("u1", "c1");
        presence.register("u1", "c2");

        assert_eq!(presence.remove_by_connection("c1"), None);
        assert!(presence.is_online("u1"));
    }

    #[test]
    fn disconnect_removes_at_most_one_entry() {
        let presence = PresenceMap::new();
        presence.register("u1", "shared");
        presence.register("u2", "shared");
        presence.register("u3", "c3");

        let removed = presence.remove_by_connection("shared");
        assert!(matches!(removed.as_deref(), Some("u1") | Some("u2")));
        assert_eq!(presence.len(), 2);
        assert!(presence.is_online("u3"));

        assert_eq!(presence.remove_by_connection("unknown"), None);
        assert_eq!(presence.len(), 2);
    }
}
