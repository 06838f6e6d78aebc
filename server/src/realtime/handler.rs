use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::realtime::actor;
use crate::state::AppState;

/// GET /ws
/// WebSocket upgrade endpoint. The handshake is refused with 403 before
/// upgrading when the request carries an origin outside the allow-list.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());

    if let Some(origin) = origin {
        if !state.origins.is_allowed(origin) {
            tracing::warn!(origin = %origin, "Realtime handshake rejected: origin not allowed");
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Origin not allowed",
                })),
            )
                .into_response();
        }
    }

    let realtime = state.realtime.clone();
    let config = state.realtime_config.clone();

    ws.max_message_size(config.max_message_bytes)
        .on_upgrade(move |socket| actor::run_connection(socket, realtime, config))
}
