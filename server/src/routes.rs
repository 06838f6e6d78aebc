use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth::login;
use crate::auth::middleware::JwtSecret;
use crate::cors::reject_disallowed_origin;
use crate::db::now_timestamp;
use crate::permissions::routes as permission_routes;
use crate::realtime::handler as realtime_handler;
use crate::resources::{crud, Collection};
use crate::scheduler::routes as scheduler_routes;
use crate::state::AppState;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// GET /api/health
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Server is running",
        "timestamp": now_timestamp(),
    }))
}

/// List/get/create/update/delete for one collection.
fn collection_routes(collection: Collection) -> Router<AppState> {
    let base = collection.path();
    Router::new()
        .route(
            base,
            get(crud::list_documents).post(crud::create_document),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(crud::get_document)
                .put(crud::update_document)
                .delete(crud::delete_document),
        )
        .layer(Extension(collection))
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // 10 requests per minute per IP on auth endpoints.
    // PeerIpKeyExtractor reads ConnectInfo<SocketAddr>.
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(6)
            .burst_size(10)
            .finish()
            .expect("constant governor settings are non-zero"),
    );
    let governor_limiter = governor_config.limiter().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    let auth_routes = Router::new()
        .route("/api/auth/register", post(login::register))
        .route("/api/auth/login", post(login::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    let public_routes = Router::new().route("/api/health", get(health_check));

    // Claims extractor on every handler below enforces the bearer token
    let permission_routes = Router::new()
        .route(
            "/api/department-permissions",
            get(permission_routes::list_permissions),
        )
        .route(
            "/api/department-permissions/{department}",
            get(permission_routes::get_permissions)
                .put(permission_routes::update_permissions)
                .delete(permission_routes::reset_permissions),
        );

    let resource_routes = Collection::ALL
        .into_iter()
        .fold(Router::new(), |router, collection| {
            router.merge(collection_routes(collection))
        });

    let admin_routes =
        Router::new().route("/api/cleanup-now", post(scheduler_routes::cleanup_now));

    // Origin is checked inside the handler, before the upgrade
    let realtime_routes = Router::new().route("/ws", get(realtime_handler::ws_upgrade));

    let cors = state.origins.cors_layer();
    let uploads = ServeDir::new(&state.uploads_dir);

    Router::new()
        .merge(auth_routes)
        .merge(public_routes)
        .merge(permission_routes)
        .merge(resource_routes)
        .merge(admin_routes)
        .merge(realtime_routes)
        .nest_service("/uploads", uploads)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            reject_disallowed_origin,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
