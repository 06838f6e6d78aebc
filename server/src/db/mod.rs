pub mod documents;
pub mod migrations;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;

/// Type alias for the shared database connection.
/// rusqlite is synchronous, so the connection sits behind Arc<Mutex> and is used
/// from tokio::task::spawn_blocking.
pub type DbPool = Arc<Mutex<Connection>>;

/// Open the document store named by `database_url` and run migrations.
///
/// Accepts a plain file path, a `sqlite://` / `sqlite:` URL, or `:memory:`.
/// File databases get WAL mode and their parent directory created.
pub fn init_db(database_url: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    let target = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if target.trim().is_empty() {
        return Err("database_url is empty".into());
    }

    let mut conn = if target == ":memory:" {
        Connection::open_in_memory()?
    } else {
        let db_path = Path::new(target);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        // Enable WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn
    };

    conn.pragma_update(None, "foreign_keys", "ON")?;

    let migrations = migrations::migrations();
    migrations.to_latest(&mut conn)?;

    tracing::info!(target = %target, "Database initialized");

    Ok(Arc::new(Mutex::new(conn)))
}

/// Run a closure against the locked connection on the blocking pool.
pub async fn with_conn<T, F>(db: &DbPool, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| ApiError::internal(format!("DB lock: {}", e)))?;
        f(&conn)
    })
    .await?
}

/// Current time in the fixed-width RFC 3339 form used for stored timestamps.
/// Fixed width keeps lexical order equal to chronological order.
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
