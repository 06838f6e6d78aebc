use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::audit::{self, LoginAttempt};
use crate::auth::jwt;
use crate::db::{documents, with_conn};
use crate::error::ApiError;
use crate::resources::crud::{check_required, email_of, object_body};
use crate::resources::{users, Action, Collection};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn issue_token(state: &AppState, user_id: &str, email: &str) -> Result<String, ApiError> {
    jwt::issue_access_token(&state.jwt_secret, user_id, email, state.jwt_expiry_secs)
        .map_err(|e| ApiError::internal(format!("JWT encoding: {}", e)))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut body = object_body(payload)?;
    check_required(Collection::Users, &body)?;
    email_of(&body)?;
    users::normalize_email(&mut body);
    let body = users::hash_password_field(body, state.bcrypt_cost).await?;

    let user = with_conn(&state.db, move |conn| {
        if let Some(email) = email_of(&body)? {
            users::ensure_email_available(conn, email, None)?;
        }
        let user = documents::insert(conn, Collection::Users.name(), body)?;
        audit::record_activity_lenient(conn, &user.id, Action::Created, Collection::Users.name(), &user.id);
        Ok(user)
    })
    .await?;

    let email = user.str_field("email").unwrap_or_default().to_string();
    let token = issue_token(&state, &user.id, &email)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "token": token,
                "user": users::public_json(&user),
            },
        })),
    ))
}

/// POST /api/auth/login
///
/// Every attempt is written to the login log, whatever the outcome.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let lookup = email.clone();
    let user = with_conn(&state.db, move |conn| {
        documents::find_one_by_field(conn, Collection::Users.name(), "email", &lookup)
    })
    .await?;

    let verified = match user
        .as_ref()
        .and_then(|u| u.str_field("password").map(str::to_string))
    {
        Some(hash) => users::verify_password(req.password, hash).await?,
        None => {
            let decoy = users::decoy_hash(&state.login_decoy, state.bcrypt_cost).await?;
            users::verify_password(req.password, decoy).await?;
            false
        }
    };

    let attempt = LoginAttempt {
        user_id: user.as_ref().map(|u| u.id.clone()),
        email: email.clone(),
        success: verified,
        ip_address: Some(peer.ip().to_string()),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    with_conn(&state.db, move |conn| {
        if let Err(e) = audit::record_login(conn, &attempt) {
            tracing::warn!(email = %attempt.email, error = %e, "Failed to record login attempt");
        }
        Ok(())
    })
    .await?;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::info!(email = %email, ip = %peer.ip(), "Login failed");
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
    };

    let token = issue_token(&state, &user.id, &email)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "user": users::public_json(&user),
        },
    })))
}
