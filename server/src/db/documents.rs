//! JSON document collections on top of a single SQLite table.
//!
//! Each row is one document: `(collection, id)` key, a JSON object body, and
//! server-managed timestamps. `id`, `createdAt` and `updatedAt` are never
//! stored inside the body; they are added back by [`Document::to_json`].

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::now_timestamp;
use crate::error::ApiError;

/// Keys owned by the store. Client-supplied values for them are dropped.
pub const RESERVED_KEYS: &[&str] = &["id", "_id", "createdAt", "updatedAt"];

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    /// Client-facing form: the body plus `id`, `createdAt`, `updatedAt`.
    pub fn to_json(&self) -> Value {
        let mut out = self.body.clone();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        out.insert(
            "createdAt".to_string(),
            Value::String(self.created_at.clone()),
        );
        out.insert(
            "updatedAt".to_string(),
            Value::String(self.updated_at.clone()),
        );
        Value::Object(out)
    }

    /// String value of a top-level field, if present.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }
}

fn strip_reserved(body: &mut Map<String, Value>) {
    for key in RESERVED_KEYS {
        body.remove(*key);
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode(raw: (String, String, String, String)) -> Result<Document, ApiError> {
    let (id, body, created_at, updated_at) = raw;
    let body = match serde_json::from_str::<Value>(&body)? {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::internal(format!(
                "document {} has non-object body: {}",
                id, other
            )))
        }
    };
    Ok(Document {
        id,
        body,
        created_at,
        updated_at,
    })
}

/// Insert a new document, assigning its id and timestamps.
pub fn insert(
    conn: &Connection,
    collection: &str,
    mut body: Map<String, Value>,
) -> Result<Document, ApiError> {
    strip_reserved(&mut body);

    let id = Uuid::now_v7().to_string();
    let now = now_timestamp();
    let raw = serde_json::to_string(&body)?;

    conn.execute(
        "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![collection, id, raw, now, now],
    )?;

    Ok(Document {
        id,
        body,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn find_by_id(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, ApiError> {
    let raw = conn
        .query_row(
            "SELECT id, body, created_at, updated_at FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            row_to_document,
        )
        .optional()?;

    raw.map(decode).transpose()
}

/// First document whose top-level `field` equals `value` (string comparison).
pub fn find_one_by_field(
    conn: &Connection,
    collection: &str,
    field: &str,
    value: &str,
) -> Result<Option<Document>, ApiError> {
    let path = format!("$.{}", field);
    let raw = conn
        .query_row(
            "SELECT id, body, created_at, updated_at FROM documents
             WHERE collection = ?1 AND json_extract(body, ?2) = ?3
             ORDER BY created_at ASC LIMIT 1",
            params![collection, path, value],
            row_to_document,
        )
        .optional()?;

    raw.map(decode).transpose()
}

/// All documents of a collection, newest first.
pub fn list(conn: &Connection, collection: &str) -> Result<Vec<Document>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, body, created_at, updated_at FROM documents
         WHERE collection = ?1 ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([collection], row_to_document)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(decode).collect()
}

/// Shallow-merge `patch` into an existing document. `None` if it does not exist.
/// A `null` value in the patch removes that key. `check` sees the merged body
/// before it is written and can veto the update.
pub fn update<F>(
    conn: &Connection,
    collection: &str,
    id: &str,
    mut patch: Map<String, Value>,
    check: F,
) -> Result<Option<Document>, ApiError>
where
    F: FnOnce(&Map<String, Value>) -> Result<(), ApiError>,
{
    strip_reserved(&mut patch);

    let Some(mut doc) = find_by_id(conn, collection, id)? else {
        return Ok(None);
    };

    for (key, value) in patch {
        if value.is_null() {
            doc.body.remove(&key);
        } else {
            doc.body.insert(key, value);
        }
    }
    check(&doc.body)?;
    doc.updated_at = now_timestamp();

    let raw = serde_json::to_string(&doc.body)?;
    conn.execute(
        "UPDATE documents SET body = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
        params![raw, doc.updated_at, collection, id],
    )?;

    Ok(Some(doc))
}

/// Delete a document. Returns whether a row was removed.
pub fn delete(conn: &Connection, collection: &str, id: &str) -> Result<bool, ApiError> {
    let removed = conn.execute(
        "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
        params![collection, id],
    )?;
    Ok(removed > 0)
}

/// Delete every document in `collection` created before `cutoff`.
pub fn delete_created_before(
    conn: &Connection,
    collection: &str,
    cutoff: &str,
) -> Result<usize, ApiError> {
    let removed = conn.execute(
        "DELETE FROM documents WHERE collection = ?1 AND created_at < ?2",
        params![collection, cutoff],
    )?;
    Ok(removed)
}

/// Delete documents in any collection whose `expiresAt` lies before `now`.
/// Unparseable `expiresAt` values are left alone.
pub fn delete_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize, ApiError> {
    let candidates: Vec<(String, String, String)> = {
        let mut stmt = conn.prepare(
            "SELECT collection, id, CAST(json_extract(body, '$.expiresAt') AS TEXT) FROM documents
             WHERE json_extract(body, '$.expiresAt') IS NOT NULL",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut removed = 0;
    for (collection, id, expires_at) in candidates {
        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|at| at.with_timezone(&Utc) < now)
            .unwrap_or(false);
        if expired && delete(conn, &collection, &id)? {
            removed += 1;
        }
    }

    Ok(removed)
}
