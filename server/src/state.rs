use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{CleanupConfig, Config, RealtimeConfig};
use crate::cors::OriginPolicy;
use crate::db::DbPool;
use crate::realtime::Realtime;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Access token signing secret
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub jwt_expiry_secs: i64,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Throwaway hash checked when a login names no known user
    pub login_decoy: Arc<OnceCell<String>>,
    /// Connections, rooms and presence for this server instance
    pub realtime: Arc<Realtime>,
    /// Browser origins accepted by HTTP and WebSocket handlers
    pub origins: OriginPolicy,
    /// Retention settings used by the cleanup sweep
    pub cleanup: CleanupConfig,
    /// WebSocket keep-alive and size limits
    pub realtime_config: RealtimeConfig,
    /// Directory served under /uploads
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(db: DbPool, jwt_secret: Vec<u8>, config: &Config) -> Self {
        Self {
            db,
            jwt_secret,
            jwt_expiry_secs: config.jwt_expiry_secs,
            bcrypt_cost: config.bcrypt_cost,
            login_decoy: Arc::new(OnceCell::new()),
            realtime: Arc::new(Realtime::new()),
            origins: OriginPolicy::new(config.effective_origins()),
            cleanup: config.cleanup.clone(),
            realtime_config: config.realtime.clone(),
            uploads_dir: PathBuf::from(&config.uploads_dir),
        }
    }
}
