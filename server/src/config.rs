use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Origins accepted when no allow-list is configured.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Command-line flags. Every field is optional so that only values given
/// on the command line (or through their env fallback) reach the final
/// layer; anything left unset serializes to nothing and lower layers win.
#[derive(Parser, Serialize, Debug, Default)]
#[command(name = "eventdesk-server", version, about = "EventDesk scheduling server")]
pub struct CliArgs {
    /// Port to listen on [default: 5000]
    #[arg(long, env = "EVENTDESK_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address [default: 0.0.0.0]
    #[arg(long, env = "EVENTDESK_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./eventdesk.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "EVENTDESK_JSON_LOGS")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_config: bool,

    /// Storage connection string: a SQLite path, `sqlite://` URL, or `:memory:`
    #[arg(long, env = "EVENTDESK_DATABASE_URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Secret used to sign access tokens
    #[arg(long, env = "EVENTDESK_JWT_SECRET", hide_env_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds [default: 86400]
    #[arg(long, env = "EVENTDESK_JWT_EXPIRY_SECS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_expiry_secs: Option<i64>,

    /// Comma-separated list of allowed browser origins
    #[arg(long, env = "EVENTDESK_ALLOWED_ORIGINS", value_delimiter = ',')]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,

    /// Directory served under /uploads [default: ./uploads]
    #[arg(long, env = "EVENTDESK_UPLOADS_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<String>,

    /// bcrypt work factor for stored passwords [default: 10]
    #[arg(long, env = "EVENTDESK_BCRYPT_COST")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcrypt_cost: Option<u32>,
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    pub generate_config: bool,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_expiry_secs: i64,
    pub allowed_origins: Vec<String>,
    pub uploads_dir: String,
    pub bcrypt_cost: u32,
    /// `[cleanup]` section
    pub cleanup: CleanupConfig,
    /// `[realtime]` section
    pub realtime: RealtimeConfig,
}

/// Configuration for the periodic cleanup sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Interval in seconds between scheduled sweeps (default: 3600 = 1 hour)
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,

    /// Notifications older than this many days are removed (default: 30)
    #[serde(default = "default_notification_retention_days")]
    pub notification_retention_days: u32,

    /// Login and activity logs older than this many days are removed (default: 90)
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            notification_retention_days: default_notification_retention_days(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_notification_retention_days() -> u32 {
    30
}

fn default_log_retention_days() -> u32 {
    90
}

/// Configuration for the WebSocket transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds between server pings (default: 25)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before closing (default: 20)
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,

    /// Largest inbound message accepted, in bytes (default: 1000000)
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_ping_interval() -> u64 {
    25
}

fn default_ping_timeout() -> u64 {
    20
}

fn default_max_message_bytes() -> usize {
    1_000_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            generate_config: false,
            database_url: None,
            jwt_secret: None,
            jwt_expiry_secs: 86400,
            allowed_origins: Vec::new(),
            uploads_dir: "./uploads".to_string(),
            bcrypt_cost: 10,
            cleanup: CleanupConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (EVENTDESK_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_cli(CliArgs::parse())
    }

    /// Resolve the layered config for already-parsed flags.
    /// Nested keys come from env with a double underscore,
    /// e.g. `EVENTDESK_CLEANUP__INTERVAL_SECS`.
    pub fn from_cli(cli: CliArgs) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("EVENTDESK_").split("__"))
            .merge(Serialized::defaults(cli))
            .extract()
    }

    /// The configured origin allow-list, or the localhost fallback when empty.
    pub fn effective_origins(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .allowed_origins
            .iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if configured.is_empty() {
            DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()
        } else {
            configured
        }
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# EventDesk Server Configuration
# Place this file at ./eventdesk.toml or specify with --config <path>
# All settings can be overridden via environment variables (EVENTDESK_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Storage connection string (REQUIRED). SQLite file path or sqlite:// URL.
# database_url = "sqlite://./data/eventdesk.db"

# Access token signing secret. A random per-process secret is used when unset,
# which invalidates every token on restart.
# jwt_secret = ""

# Access token lifetime in seconds (default: 86400 = 24 hours)
# jwt_expiry_secs = 86400

# Browser origins allowed for HTTP and WebSocket requests.
# Default: localhost:3000/5173 on both localhost and 127.0.0.1
# allowed_origins = ["https://calendar.example.com"]

# Directory served under /uploads
# uploads_dir = "./uploads"

# bcrypt work factor for stored passwords (default: 10)
# bcrypt_cost = 10

# ---- Cleanup Sweep ----
# [cleanup]
# interval_secs = 3600                  # 1 hour between scheduled sweeps
# notification_retention_days = 30
# log_retention_days = 90               # login logs and user activity logs

# ---- Realtime ----
# [realtime]
# ping_interval_secs = 25
# ping_timeout_secs = 20
# max_message_bytes = 1000000
"#
    .to_string()
}
