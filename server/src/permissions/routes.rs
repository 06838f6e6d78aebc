use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::audit;
use crate::auth::middleware::Claims;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::permissions::store;
use crate::resources::Action;
use crate::state::AppState;

const RESOURCE: &str = "department_permissions";

/// GET /api/department-permissions: every stored department, sorted by name.
pub async fn list_permissions(
    State(state): State<AppState>,
    _claims: Claims,
) -> Result<Json<Value>, ApiError> {
    let all = with_conn(&state.db, store::get_all).await?;
    Ok(Json(json!({ "success": true, "data": all })))
}

/// GET /api/department-permissions/{department}
///
/// Never 404s: an unknown department reads as all flags false.
pub async fn get_permissions(
    State(state): State<AppState>,
    _claims: Claims,
    Path(department): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = with_conn(&state.db, move |conn| store::get(conn, &department)).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

/// PUT /api/department-permissions/{department}
///
/// Accepts the flag object itself or `{ "permissions": { ... } }`.
pub async fn update_permissions(
    State(state): State<AppState>,
    claims: Claims,
    Path(department): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let flags = match body.get("permissions") {
        Some(inner @ Value::Object(_)) => inner.clone(),
        _ => body,
    };

    let user_id = claims.sub.clone();
    let record = with_conn(&state.db, move |conn| {
        let record = store::set(conn, &department, &flags, &user_id)?;
        audit::record_activity_lenient(conn, &user_id, Action::Updated, RESOURCE, &record.department);
        Ok(record)
    })
    .await?;

    tracing::info!(
        department = %record.department,
        user_id = %claims.sub,
        "Department permissions updated"
    );

    Ok(Json(json!({ "success": true, "data": record })))
}

/// DELETE /api/department-permissions/{department}: grant every flag.
pub async fn reset_permissions(
    State(state): State<AppState>,
    claims: Claims,
    Path(department): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = claims.sub.clone();
    let record = with_conn(&state.db, move |conn| {
        let record = store::reset(conn, &department, &user_id)?;
        audit::record_activity_lenient(conn, &user_id, Action::Deleted, RESOURCE, &record.department);
        Ok(record)
    })
    .await?;

    tracing::info!(
        department = %record.department,
        user_id = %claims.sub,
        "Department permissions reset"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Permissions reset to defaults",
        "data": record,
    })))
}
