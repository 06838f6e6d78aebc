use std::net::SocketAddr;
use tokio::net::TcpListener;

use eventdesk_server::auth::jwt::resolve_jwt_secret;
use eventdesk_server::config::{generate_config_template, Config};
use eventdesk_server::realtime::Realtime;
use eventdesk_server::scheduler::task::spawn_cleanup_task;
use eventdesk_server::state::AppState;
use eventdesk_server::{db, routes};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("eventdesk_server=info,tower_http=info"))?;
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    tracing::info!("EventDesk server v{} starting", env!("CARGO_PKG_VERSION"));

    let database_url = config
        .database_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or("database_url is required (set EVENTDESK_DATABASE_URL or --database-url)")?;

    let db = db::init_db(database_url)?;
    let jwt_secret = resolve_jwt_secret(config.jwt_secret.as_deref());

    std::fs::create_dir_all(&config.uploads_dir)?;

    let app_state = AppState::new(db.clone(), jwt_secret, &config);
    let realtime = app_state.realtime.clone();

    // Storage is up; start the periodic sweep
    let cleanup_handle = spawn_cleanup_task(db, config.cleanup.clone());
    tracing::info!(
        interval_secs = config.cleanup.interval_secs,
        "Cleanup scheduler started"
    );

    tracing::info!(origins = ?app_state.origins.allowed(), "Allowed origins");

    let app = routes::build_router(app_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(realtime))
    .await?;

    cleanup_handle.abort();
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolve on Ctrl+C and tell realtime clients we are going away.
async fn shutdown_signal(realtime: std::sync::Arc<Realtime>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!(
        connections = realtime.connection_count(),
        "Shutdown requested, closing realtime connections"
    );
    realtime.close_all("Server shutting down");
}
