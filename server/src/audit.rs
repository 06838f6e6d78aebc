//! Login and user-activity audit records.
//!
//! Both are ordinary documents in their own collections so they get the
//! same REST surface and retention sweep as everything else.

use rusqlite::Connection;
use serde_json::{json, Map, Value};

use crate::db::documents::{self, Document};
use crate::error::ApiError;
use crate::resources::{Action, Collection};

/// One login attempt, successful or not.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub user_id: Option<String>,
    pub email: String,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn record_login(conn: &Connection, attempt: &LoginAttempt) -> Result<Document, ApiError> {
    documents::insert(
        conn,
        Collection::LoginLogs.name(),
        object(json!({
            "userId": attempt.user_id,
            "email": attempt.email,
            "success": attempt.success,
            "ipAddress": attempt.ip_address,
            "userAgent": attempt.user_agent,
        })),
    )
}

pub fn record_activity(
    conn: &Connection,
    user_id: &str,
    action: Action,
    resource: &str,
    resource_id: &str,
) -> Result<Document, ApiError> {
    documents::insert(
        conn,
        Collection::UserActivityLogs.name(),
        object(json!({
            "userId": user_id,
            "action": action.as_str(),
            "resource": resource,
            "resourceId": resource_id,
        })),
    )
}

/// Record activity without failing the surrounding request.
pub fn record_activity_lenient(
    conn: &Connection,
    user_id: &str,
    action: Action,
    resource: &str,
    resource_id: &str,
) {
    if let Err(e) = record_activity(conn, user_id, action, resource, resource_id) {
        tracing::warn!(
            user_id = %user_id,
            resource = %resource,
            error = %e,
            "Failed to record user activity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::migrations::migrations()
            .to_latest(&mut conn)
            .unwrap();
        conn
    }

    #[test]
    fn login_attempts_are_stored() {
        let conn = test_conn();
        record_login(
            &conn,
            &LoginAttempt {
                user_id: None,
                email: "nobody@example.com".to_string(),
                success: false,
                ip_address: Some("127.0.0.1".to_string()),
                user_agent: None,
            },
        )
        .unwrap();

        let logs = documents::list(&conn, Collection::LoginLogs.name()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].body["success"], json!(false));
        assert_eq!(logs[0].body["userId"], Value::Null);
    }

    #[test]
    fn activity_entries_name_the_resource() {
        let conn = test_conn();
        record_activity(&conn, "u1", Action::Deleted, "events", "e1").unwrap();

        let logs = documents::list(&conn, Collection::UserActivityLogs.name()).unwrap();
        assert_eq!(logs[0].body["action"], json!("delete"));
        assert_eq!(logs[0].body["resource"], json!("events"));
        assert_eq!(logs[0].body["resourceId"], json!("e1"));
    }
}
