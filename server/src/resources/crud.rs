//! Generic REST handlers shared by every document collection.
//!
//! The router mounts the same five handlers once per [`Collection`] and
//! passes the collection in as an `Extension`.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Map, Value};

use crate::audit;
use crate::auth::middleware::Claims;
use crate::db::{documents, documents::Document, with_conn};
use crate::error::ApiError;
use crate::resources::{notify, users, Action, Collection};
use crate::state::AppState;

/// Request body as a JSON object.
pub fn object_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    let Json(value) = payload?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::validation("Request body must be a JSON object")),
    }
}

pub(crate) fn check_required(collection: Collection, body: &Map<String, Value>) -> Result<(), ApiError> {
    let missing: Vec<&str> = collection
        .required_fields()
        .iter()
        .copied()
        .filter(|field| match body.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Client-facing JSON for a stored document.
fn render(collection: Collection, doc: &Document) -> Value {
    match collection {
        Collection::Users => users::public_json(doc),
        _ => doc.to_json(),
    }
}

/// Exact match of a query parameter against a top-level scalar field.
fn field_matches(doc: &Value, field: &str, expected: &str) -> bool {
    match doc.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        _ => false,
    }
}

fn not_found(collection: Collection) -> ApiError {
    ApiError::NotFound(format!("{} not found", collection.label()))
}

/// Field recording who created a document, always taken from the token.
fn owner_field(collection: Collection) -> Option<&'static str> {
    match collection {
        Collection::Events => Some("createdBy"),
        Collection::Messages => Some("senderId"),
        _ => None,
    }
}

pub(crate) fn email_of(body: &Map<String, Value>) -> Result<Option<&str>, ApiError> {
    match body.get("email") {
        None => Ok(None),
        Some(Value::String(email)) => Ok(Some(email.as_str())),
        Some(_) => Err(ApiError::validation("email must be a string")),
    }
}

/// GET /api/{resource}: every document, newest first, filtered by query params.
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    _claims: Claims,
    Query(filters): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let docs = with_conn(&state.db, move |conn| documents::list(conn, collection.name())).await?;

    let data: Vec<Value> = docs
        .iter()
        .map(|doc| render(collection, doc))
        .filter(|doc| {
            filters
                .iter()
                .all(|(field, expected)| field_matches(doc, field, expected))
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /api/{resource}/{id}
pub async fn get_document(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    _claims: Claims,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let doc = with_conn(&state.db, move |conn| {
        documents::find_by_id(conn, collection.name(), &id)
    })
    .await?
    .ok_or_else(|| not_found(collection))?;

    Ok(Json(json!({ "success": true, "data": render(collection, &doc) })))
}

/// POST /api/{resource}
pub async fn create_document(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    claims: Claims,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut body = object_body(payload)?;
    check_required(collection, &body)?;

    match collection {
        Collection::Users => {
            email_of(&body)?;
            users::normalize_email(&mut body);
            body = users::hash_password_field(body, state.bcrypt_cost).await?;
        }
        _ => {}
    }
    if let Some(field) = owner_field(collection) {
        body.insert(field.to_string(), Value::String(claims.sub.clone()));
    }

    let user_id = claims.sub.clone();
    let doc = with_conn(&state.db, move |conn| {
        if collection == Collection::Users {
            if let Some(email) = email_of(&body)? {
                users::ensure_email_available(conn, email, None)?;
            }
        }

        let doc = documents::insert(conn, collection.name(), body)?;
        if !collection.is_audit_log() {
            audit::record_activity_lenient(conn, &user_id, Action::Created, collection.name(), &doc.id);
        }
        Ok(doc)
    })
    .await?;

    let data = render(collection, &doc);
    notify::publish(&state.realtime, collection, Action::Created, &data);

    tracing::info!(
        collection = collection.name(),
        id = %doc.id,
        user_id = %claims.sub,
        "Document created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    ))
}

/// PUT /api/{resource}/{id}: shallow merge, `null` removes a field.
pub async fn update_document(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    claims: Claims,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut patch = object_body(payload)?;
    if let Some(field) = owner_field(collection) {
        patch.remove(field);
    }

    if collection == Collection::Users {
        email_of(&patch)?;
        users::normalize_email(&mut patch);
        patch = users::hash_password_field(patch, state.bcrypt_cost).await?;
    }

    let user_id = claims.sub.clone();
    let doc = with_conn(&state.db, move |conn| {
        if collection == Collection::Users {
            if let Some(email) = email_of(&patch)? {
                users::ensure_email_available(conn, email, Some(id.as_str()))?;
            }
        }

        let doc = documents::update(conn, collection.name(), &id, patch, |merged| {
            check_required(collection, merged)
        })?
        .ok_or_else(|| not_found(collection))?;
        if !collection.is_audit_log() {
            audit::record_activity_lenient(conn, &user_id, Action::Updated, collection.name(), &doc.id);
        }
        Ok(doc)
    })
    .await?;

    let data = render(collection, &doc);
    notify::publish(&state.realtime, collection, Action::Updated, &data);

    tracing::info!(
        collection = collection.name(),
        id = %doc.id,
        user_id = %claims.sub,
        "Document updated"
    );

    Ok(Json(json!({ "success": true, "data": data })))
}

/// DELETE /api/{resource}/{id}: responds with the removed document.
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(collection): Extension<Collection>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = claims.sub.clone();
    let doc = with_conn(&state.db, move |conn| {
        let doc = documents::find_by_id(conn, collection.name(), &id)?
            .ok_or_else(|| not_found(collection))?;
        if !documents::delete(conn, collection.name(), &id)? {
            return Err(not_found(collection));
        }
        if !collection.is_audit_log() {
            audit::record_activity_lenient(conn, &user_id, Action::Deleted, collection.name(), &doc.id);
        }
        Ok(doc)
    })
    .await?;

    let data = render(collection, &doc);
    notify::publish(&state.realtime, collection, Action::Deleted, &data);

    tracing::info!(
        collection = collection.name(),
        id = %doc.id,
        user_id = %claims.sub,
        "Document deleted"
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("{} deleted", collection.label()),
        "data": data,
    })))
}
