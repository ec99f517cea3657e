//! Server configuration, loaded from environment variables at startup.

use anonchat_core::{DEFAULT_MAX_UPLOAD_BYTES, MAX_MESSAGES};

/// Runtime configuration for anonchat-server.
///
/// Every field has a default so the server runs without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// Message store URL (default: `"sqlite://chat_log.db"`).
    /// `json://<path>` selects the flat-file store instead.
    pub store_url: String,

    /// Directory holding uploaded attachments (default: `"uploads"`).
    pub upload_dir: String,

    /// Number of messages the room retains.
    pub max_messages: usize,

    /// Cap on an upload request body, in bytes.
    pub max_upload_bytes: usize,

    /// How often the browser page polls `/messages`.
    pub poll_interval_ms: u64,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_openapi: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("ANONCHAT_BIND", "0.0.0.0:8080"),
            store_url: env_or("ANONCHAT_STORE_URL", "sqlite://chat_log.db"),
            upload_dir: env_or("ANONCHAT_UPLOAD_DIR", "uploads"),
            max_messages: parse_env("ANONCHAT_MAX_MESSAGES", MAX_MESSAGES),
            max_upload_bytes: parse_env("ANONCHAT_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            poll_interval_ms: parse_env("ANONCHAT_POLL_INTERVAL_MS", 1000),
            log_level: env_or("ANONCHAT_LOG", "info"),
            log_json: env_flag("ANONCHAT_LOG_JSON", false),
            cors_allowed_origins: std::env::var("ANONCHAT_CORS_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            enable_openapi: env_flag("ANONCHAT_ENABLE_OPENAPI", true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            store_url: "sqlite://chat_log.db".into(),
            upload_dir: "uploads".into(),
            max_messages: MAX_MESSAGES,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            poll_interval_ms: 1000,
            log_level: "info".into(),
            log_json: false,
            cors_allowed_origins: None,
            enable_openapi: true,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
