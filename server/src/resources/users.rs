//! User-specific document handling: password hashing, email uniqueness,
//! and stripping secrets from responses.

use rusqlite::Connection;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::db::documents::{self, Document};
use crate::error::ApiError;
use crate::resources::Collection;

/// Client-facing JSON for a user document, without the password hash.
pub fn public_json(doc: &Document) -> Value {
    let mut json = doc.to_json();
    if let Some(obj) = json.as_object_mut() {
        obj.remove("password");
    }
    json
}

/// Trim and lowercase `email` in place when it is a string.
pub fn normalize_email(body: &mut Map<String, Value>) {
    if let Some(Value::String(email)) = body.get_mut("email") {
        *email = email.trim().to_lowercase();
    }
}

/// Fail with 409 if another user already has `email`.
pub fn ensure_email_available(
    conn: &Connection,
    email: &str,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let existing = documents::find_one_by_field(conn, Collection::Users.name(), "email", email)?;
    match existing {
        Some(doc) if Some(doc.id.as_str()) != except_id => Err(ApiError::Conflict(
            "A user with this email already exists".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Replace a plaintext `password` in `body` with its bcrypt hash.
/// Bodies without a password pass through unchanged.
pub async fn hash_password_field(
    mut body: Map<String, Value>,
    cost: u32,
) -> Result<Map<String, Value>, ApiError> {
    let Some(password) = body.get("password") else {
        return Ok(body);
    };

    let password = match password.as_str() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => return Err(ApiError::validation("password must be a non-empty string")),
    };

    let hashed = hash_password(password, cost).await?;
    body.insert("password".to_string(), Value::String(hashed));
    Ok(body)
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| ApiError::internal(format!("bcrypt hash: {}", e)))
}

/// Hash of a random password at `cost`, computed on first use and cached in
/// `cell`. Logins for unknown accounts verify against it so they take as long
/// as logins for real ones.
pub async fn decoy_hash(cell: &OnceCell<String>, cost: u32) -> Result<String, ApiError> {
    let hash = cell
        .get_or_try_init(|| hash_password(Uuid::now_v7().to_string(), cost))
        .await?;
    Ok(hash.clone())
}

/// Check `password` against a stored bcrypt hash. Malformed hashes never match.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(verified.unwrap_or(false))
}
