//! Origin allow-list shared by the HTTP layer and the WebSocket handshake.

use axum::{
    extract::State,
    http::{header::ORIGIN, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<Vec<String>>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: Arc::new(allowed),
        }
    }

    /// Exact match after dropping a trailing slash.
    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim().trim_end_matches('/');
        self.allowed.iter().any(|allowed| allowed == origin)
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// CORS response headers for allowed origins.
    pub fn cors_layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts| {
                    origin
                        .to_str()
                        .map(|o| policy.is_allowed(o))
                        .unwrap_or(false)
                },
            ))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
            ])
            .allow_credentials(true)
    }
}

/// Reject requests whose `Origin` header is present but not allowed.
/// Requests without an `Origin` (non-browser clients) pass through.
pub async fn reject_disallowed_origin(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| state.origins.is_allowed(o))
            .unwrap_or(false);

        if !allowed {
            tracing::warn!(origin = ?origin, path = %req.uri().path(), "Request rejected: origin not allowed");
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

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_origins_only() {
        let policy = OriginPolicy::new(vec!["http://localhost:3000".to_string()]);
        assert!(policy.is_allowed("http://localhost:3000"));
        assert!(policy.is_allowed("http://localhost:3000/"));
        assert!(!policy.is_allowed("http://localhost:3001"));
        assert!(!policy.is_allowed("http://evil.example.com"));
        assert!(!policy.is_allowed("http://localhost:3000.evil.example.com"));
    }
}
