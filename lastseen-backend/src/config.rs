use std::env::var;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the store file
    /// Env: LASTSEEN_DATA_DIR (default: "plugins/LastSeen")
    pub data_dir: String,

    /// Store identifier; the file is `<data_dir>/<store_id>.yml`
    /// Env: LASTSEEN_STORE_ID (default: "last-seen")
    pub store_id: String,

    /// Time every last-seen lookup and log the latency
    /// Env: LASTSEEN_DEBUG (default: false)
    pub debug: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        Self {
            data_dir: env_or_default_string("LASTSEEN_DATA_DIR", "plugins/LastSeen"),
            store_id: env_or_default_string("LASTSEEN_STORE_ID", lastseen_db::LAST_SEEN_STORE),
            debug: env_or_default("LASTSEEN_DEBUG", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "plugins/LastSeen".to_string(),
            store_id: lastseen_db::LAST_SEEN_STORE.to_string(),
            debug: false,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
