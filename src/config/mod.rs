//! Configuration module for the fleet quote backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Settings for the external text-generation endpoint.
#[derive(Debug, Clone)]
pub struct TextGenConfig {
    /// API key; without one every observation uses the local template
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API (without trailing `/chat/completions`)
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for TextGenConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
    /// Lifetime of a login session in hours
    pub session_ttl_hours: i64,
    /// Administrator account ensured at startup
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub textgen: TextGenConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("FLEETQUOTE_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let index_path = env::var("FLEETQUOTE_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("FLEETQUOTE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid FLEETQUOTE_BIND_ADDR format");

        let log_level = env::var("FLEETQUOTE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("FLEETQUOTE_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let session_ttl_hours = env::var("FLEETQUOTE_SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|h: &i64| *h > 0)
            .unwrap_or(12);

        let admin_email = non_empty_var("FLEETQUOTE_ADMIN_EMAIL");
        let admin_password = non_empty_var("FLEETQUOTE_ADMIN_PASSWORD");

        let defaults = TextGenConfig::default();
        let textgen = TextGenConfig {
            api_key: non_empty_var("FLEETQUOTE_TEXTGEN_API_KEY"),
            base_url: env::var("FLEETQUOTE_TEXTGEN_BASE_URL").unwrap_or(defaults.base_url),
            model: env::var("FLEETQUOTE_TEXTGEN_MODEL").unwrap_or(defaults.model),
            timeout_secs: env::var("FLEETQUOTE_TEXTGEN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        };

        Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            log_json,
            session_ttl_hours,
            admin_email,
            admin_password,
            textgen,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
