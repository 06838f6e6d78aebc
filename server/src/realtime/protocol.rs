//! JSON event frames exchanged over the socket.
//!
//! Every text frame is `{"event": "<name>", "data": <any>}` in both
//! directions.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::presence::JoinOutcome;
use super::rooms::conversation_room;
use super::Realtime;

/// Inbound frame before the event name is interpreted.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Outbound frame.
#[derive(Debug, Serialize)]
pub struct ServerFrame<'a> {
    pub event: &'a str,
    pub data: Value,
}

impl<'a> ServerFrame<'a> {
    pub fn new(event: &'a str, data: Value) -> Self {
        Self { event, data }
    }

    pub fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .ok()
            .map(|text| Message::Text(text.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    JoinUserRoom(String),
    JoinConversation(String),
    LeaveConversation(String),
    TestConnection(Value),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("{0} requires an id")]
    MissingId(&'static str),
}

/// Ids arrive as strings, numbers, or `{ "id": ... }` / `{ "userId": ... }` objects.
fn id_from(data: &Value) -> Option<String> {
    match data {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => ["userId", "conversationId", "id"]
            .iter()
            .find_map(|key| obj.get(*key))
            .and_then(id_from),
        _ => None,
    }
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let ClientFrame { event, data } = serde_json::from_str(text)?;

        match event.as_str() {
            "join-user-room" => Ok(Self::JoinUserRoom(require_id(&data, "join-user-room")?)),
            "join-conversation" => Ok(Self::JoinConversation(require_id(&data, "join-conversation")?)),
            "leave-conversation" => Ok(Self::LeaveConversation(require_id(&data, "leave-conversation")?)),
            "test-connection" => Ok(Self::TestConnection(data)),
            _ => Err(ProtocolError::UnknownEvent(event.clone())),
        }
    }
}

fn require_id(data: &Value, event: &'static str) -> Result<String, ProtocolError> {
    id_from(data).ok_or(ProtocolError::MissingId(event))
}

/// Handle one inbound text frame for `connection_id`.
/// Bad frames are logged and dropped; the connection stays open.
pub fn handle_text_message(realtime: &Realtime, connection_id: &str, text: &str) {
    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                error = %e,
                "Ignoring realtime frame"
            );
            return;
        }
    };

    match event {
        ClientEvent::JoinUserRoom(user_id) => {
            match realtime.join_user_room(connection_id, &user_id) {
                JoinOutcome::Registered => {
                    tracing::info!(user_id = %user_id, connection_id = %connection_id, "User joined room");
                }
                JoinOutcome::Reconnected { previous } => {
                    tracing::info!(
                        user_id = %user_id,
                        connection_id = %connection_id,
                        previous = %previous,
                        "User reconnected, presence moved to new connection"
                    );
                }
                JoinOutcome::AlreadyRegistered => {
                    tracing::debug!(user_id = %user_id, connection_id = %connection_id, "User already in room");
                }
            }
        }
        ClientEvent::JoinConversation(id) => {
            realtime.join_room(connection_id, &conversation_room(&id));
            tracing::debug!(conversation_id = %id, connection_id = %connection_id, "Joined conversation");
        }
        ClientEvent::LeaveConversation(id) => {
            realtime.leave_room(connection_id, &conversation_room(&id));
            tracing::debug!(conversation_id = %id, connection_id = %connection_id, "Left conversation");
        }
        ClientEvent::TestConnection(data) => {
            realtime.send_to_connection(
                connection_id,
                "test-response",
                json!({
                    "message": "Server received test",
                    "data": data,
                    "connectionId": connection_id,
                    "timestamp": crate::db::now_timestamp(),
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn parses_known_events() {
        assert_eq!(
            ClientEvent::parse(r#"{"event":"join-user-room","data":"u1"}"#).unwrap(),
            ClientEvent::JoinUserRoom("u1".to_string())
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"join-conversation","data":42}"#).unwrap(),
            ClientEvent::JoinConversation("42".to_string())
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"leave-conversation","data":{"conversationId":"c9"}}"#)
                .unwrap(),
            ClientEvent::LeaveConversation("c9".to_string())
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"test-connection"}"#).unwrap(),
            ClientEvent::TestConnection(Value::Null)
        );
    }

    #[test]
    fn rejects_bad_frames() {
        assert!(matches!(
            ClientEvent::parse("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientEvent::parse(r#"{"event":"join-user-room","data":""}"#),
            Err(ProtocolError::MissingId(_))
        ));
        assert!(matches!(
            ClientEvent::parse(r#"{"event":"shout","data":1}"#),
            Err(ProtocolError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_connection_echoes_to_sender() {
        let realtime = Realtime::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = realtime.connect(tx);

        handle_text_message(&realtime, &conn, r#"{"event":"test-connection","data":{"ping":1}}"#);

        let Message::Text(text) = rx.try_recv().unwrap() else {
            panic!("expected text frame");
        };
        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(frame["event"], json!("test-response"));
        assert_eq!(frame["data"]["data"]["ping"], json!(1));
        assert_eq!(frame["data"]["connectionId"], json!(conn));
    }
}
