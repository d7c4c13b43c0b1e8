//! Client configuration, read from environment variables

use std::path::PathBuf;
use std::time::Duration;

/// Endpoints and timing knobs for the data layer
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identity service base URL
    pub users_api_url: String,
    /// Reservation service base URL
    pub reservations_api_url: String,
    /// Search/availability service base URL
    pub search_api_url: String,
    /// Directory holding the persisted session
    pub data_dir: PathBuf,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// How long a cached success keeps being served without a refetch
    pub stale_time: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            users_api_url: "http://localhost:8080".to_string(),
            reservations_api_url: "http://localhost:8081".to_string(),
            search_api_url: "http://localhost:8082".to_string(),
            data_dir: PathBuf::from("./data"),
            request_timeout: Duration::from_secs(10),
            stale_time: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        let defaults = Self::default();

        Self {
            users_api_url: var_or("MESA_USERS_API_URL", defaults.users_api_url),
            reservations_api_url: var_or(
                "MESA_RESERVATIONS_API_URL",
                defaults.reservations_api_url,
            ),
            search_api_url: var_or("MESA_SEARCH_API_URL", defaults.search_api_url),
            data_dir: std::env::var("MESA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            request_timeout: secs_or("MESA_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            stale_time: secs_or("MESA_STALE_TIME_SECS", defaults.stale_time),
        }
    }
}

fn var_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn secs_or(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
