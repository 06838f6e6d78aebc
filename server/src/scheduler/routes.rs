use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::scheduler::cleanup::run_cleanup_pass;
use crate::state::AppState;

/// POST /api/cleanup-now: run one sweep immediately.
pub async fn cleanup_now(
    State(state): State<AppState>,
    claims: Claims,
) -> (StatusCode, Json<Value>) {
    match run_cleanup_pass(&state.db, state.cleanup.clone()).await {
        Ok(report) => {
            tracing::info!(
                user_id = %claims.sub,
                removed = report.total(),
                "Manual cleanup completed"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Cleanup completed",
                    "result": report,
                })),
            )
        }
        Err(e) => {
            tracing::error!(user_id = %claims.sub, error = %e, "Manual cleanup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Cleanup failed",
                })),
            )
        }
    }
}
