//! Errors raised while talking to the iopool API.

use thiserror::Error;

/// Result type for telemetry operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Error type for telemetry fetches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No API key configured; nothing is fetched until the settings change
    #[error("Missing apiKey or poolId in settings")]
    MissingCredentials,

    /// 401/403 from the API; permanent until the key is replaced
    #[error("Auth failed ({0}): API key invalid or insufficient permissions")]
    Unauthorized(u16),

    /// The configured pool no longer exists
    #[error("Pool {0} not found")]
    NotFound(String),

    /// The API key has no pool attached
    #[error("No pools found for this API key")]
    NoPools,

    /// Any other non-success status
    #[error("HTTP {0}")]
    Http(u16),

    /// Body is not JSON, or not the expected object/array
    #[error("Unexpected API response: {0}")]
    Parse(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// The configured API base URL is unusable
    #[error("Invalid API endpoint: {0}")]
    InvalidEndpoint(String),
}

impl PoolError {
    /// 401/403; polling stays blocked until the settings change.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Reason shown to the user while the device is unavailable.
    pub fn unavailable_reason(&self) -> String {
        match self {
            Self::MissingCredentials | Self::NotFound(_) | Self::NoPools => self.to_string(),
            other => format!("API error: {}", other),
        }
    }
}
