//! Shared configuration defaults.
//!
//! Constants and small helpers used by every crate of the bridge, so the
//! polling limits and endpoint defaults are defined in exactly one place.

/// Default endpoint constants
pub mod endpoints {
    /// iopool public API, version 1
    pub const IOPOOL_API: &str = "https://api.iopool.com/v1";
    /// Path of the pool list, relative to the API base
    pub const POOLS_PATH: &str = "/pools";
    /// Header carrying the API key
    pub const API_KEY_HEADER: &str = "x-api-key";
}

/// Polling constants
pub mod polling {
    /// Interval used when the device settings carry none (minutes)
    pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;
    /// Shortest accepted interval (minutes)
    pub const MIN_INTERVAL_MINUTES: u64 = 1;
    /// Longest accepted interval (minutes): one day
    pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;
    /// Interval written by the pairing flow when it creates a device (minutes)
    pub const PAIRING_INTERVAL_MINUTES: u64 = 30;
    /// Timeout for a single API request (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Maximum number of response body characters kept in logs
    pub const LOGGED_BODY_CHARS: usize = 300;
}

/// Pairing constants
pub mod pairing {
    /// Display name proposed for a freshly paired device
    pub const DEFAULT_DEVICE_NAME: &str = "iopool Pool";
}

/// Environment variable names
pub mod env_vars {
    use super::{endpoints, polling};

    pub const API_KEY: &str = "IOPOOL_API_KEY";
    pub const POOL_ID: &str = "IOPOOL_POOL_ID";
    pub const ENDPOINT: &str = "IOPOOL_ENDPOINT";
    pub const POLL_MINUTES: &str = "IOPOOL_POLL_MINUTES";
    /// Switch the CLI to JSON log output
    pub const LOG_JSON: &str = "IOPOOL_LOG_JSON";

    fn non_empty(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// API key from the environment, if set and non-empty
    pub fn api_key() -> Option<String> {
        non_empty(API_KEY)
    }

    /// Pool id from the environment, if set and non-empty
    pub fn pool_id() -> Option<String> {
        non_empty(POOL_ID)
    }

    /// API endpoint from the environment, or the public iopool API
    pub fn endpoint() -> String {
        non_empty(ENDPOINT).unwrap_or_else(|| endpoints::IOPOOL_API.to_string())
    }

    /// Polling interval in minutes from the environment, or the default
    pub fn poll_minutes() -> u64 {
        non_empty(POLL_MINUTES)
            .and_then(|s| s.parse().ok())
            .unwrap_or(polling::DEFAULT_INTERVAL_MINUTES)
    }

    /// Whether JSON log output was requested
    pub fn log_json() -> bool {
        non_empty(LOG_JSON)
            .and_then(|v| v.parse().ok())
            .unwrap_or(false)
    }
}

/// Clamp a polling interval to the accepted range.
///
/// A zero or too-small interval would hammer the API; it is raised to
/// [`polling::MIN_INTERVAL_MINUTES`]. Larger values than
/// [`polling::MAX_INTERVAL_MINUTES`] are lowered to it.
pub fn clamp_polling_interval(minutes: u64) -> u64 {
    if minutes < polling::MIN_INTERVAL_MINUTES {
        tracing::warn!(
            requested = minutes,
            minimum = polling::MIN_INTERVAL_MINUTES,
            "Polling interval below minimum, clamping"
        );
        polling::MIN_INTERVAL_MINUTES
    } else if minutes > polling::MAX_INTERVAL_MINUTES {
        tracing::warn!(
            requested = minutes,
            maximum = polling::MAX_INTERVAL_MINUTES,
            "Polling interval above maximum, clamping"
        );
        polling::MAX_INTERVAL_MINUTES
    } else {
        minutes
    }
}

/// Strip trailing slashes from an API base URL.
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}
