//! Realtime fan-out for resource mutations.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::realtime::Realtime;
use crate::resources::{Action, Collection};

fn event_name(collection: Collection, action: Action) -> Option<&'static str> {
    let name = match (collection, action) {
        (Collection::Events, Action::Created) => "event-created",
        (Collection::Events, Action::Updated) => "event-updated",
        (Collection::Events, Action::Deleted) => "event-deleted",
        (Collection::Messages, Action::Created) => "new-message",
        (Collection::Messages, Action::Updated) => "message-updated",
        (Collection::Messages, Action::Deleted) => "message-deleted",
        (Collection::Notifications, Action::Created) => "new-notification",
        (Collection::Notifications, Action::Updated) => "notification-updated",
        (Collection::Notifications, Action::Deleted) => "notification-deleted",
        _ => return None,
    };
    Some(name)
}

fn id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rooms that should hear about a change to `doc`.
pub fn target_rooms(collection: Collection, doc: &Value) -> Vec<String> {
    use crate::realtime::rooms::{conversation_room, user_room};

    // Ordered and deduplicated so a creator listed as participant hears once
    let mut rooms = BTreeSet::new();

    match collection {
        Collection::Events => {
            if let Some(creator) = id_value(doc.get("createdBy")) {
                rooms.insert(user_room(&creator));
            }
            if let Some(Value::Array(participants)) = doc.get("participants") {
                for participant in participants {
                    if let Some(id) = id_value(Some(participant)) {
                        rooms.insert(user_room(&id));
                    }
                }
            }
        }
        Collection::Messages => {
            if let Some(conversation) = id_value(doc.get("conversationId")) {
                rooms.insert(conversation_room(&conversation));
            }
            if let Some(recipient) = id_value(doc.get("recipientId")) {
                rooms.insert(user_room(&recipient));
            }
        }
        Collection::Notifications => {
            if let Some(user) = id_value(doc.get("userId")) {
                rooms.insert(user_room(&user));
            }
        }
        _ => {}
    }

    rooms.into_iter().collect()
}

/// Emit the realtime event for a mutation. Collections without realtime
/// events are ignored.
pub fn publish(realtime: &Realtime, collection: Collection, action: Action, doc: &Value) {
    let Some(event) = event_name(collection, action) else {
        return;
    };

    for room in target_rooms(collection, doc) {
        realtime.emit_to_room(&room, event, doc.clone());
    }
}
