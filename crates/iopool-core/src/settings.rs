//! Device settings as persisted by the host.

use crate::config::{clamp_polling_interval, polling};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Setting keys, as reported in `changed_keys` by the host.
pub mod keys {
    pub const API_KEY: &str = "apiKey";
    pub const POOL_ID: &str = "poolId";
    pub const POLLING_INTERVAL: &str = "pollingInterval";
}

/// iopool API key.
///
/// `Debug` never prints the secret.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// True when the key is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Deref for ApiKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Settings of one pool device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    #[serde(default)]
    pub api_key: ApiKey,
    #[serde(default)]
    pub pool_id: String,
    /// Minutes between two polls
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
}

fn default_polling_interval() -> u64 {
    polling::DEFAULT_INTERVAL_MINUTES
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            pool_id: String::new(),
            polling_interval: default_polling_interval(),
        }
    }
}

impl DeviceSettings {
    pub fn new(api_key: impl Into<ApiKey>, pool_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            pool_id: pool_id.into(),
            ..Self::default()
        }
    }

    pub fn with_polling_interval(mut self, minutes: u64) -> Self {
        self.polling_interval = minutes;
        self
    }

    /// Trimmed copy; hosts may hand back values with stray whitespace.
    pub fn normalized(&self) -> Self {
        Self {
            api_key: ApiKey::new(self.api_key.0.clone()),
            pool_id: self.pool_id.trim().to_string(),
            polling_interval: self.polling_interval,
        }
    }

    /// API key, if present.
    pub fn api_key(&self) -> Option<&ApiKey> {
        (!self.api_key.is_blank()).then_some(&self.api_key)
    }

    /// Pool id, if present.
    pub fn pool_id(&self) -> Option<&str> {
        let id = self.pool_id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// Polling interval in minutes, clamped to the accepted minimum.
    pub fn effective_interval_minutes(&self) -> u64 {
        clamp_polling_interval(self.polling_interval)
    }
}

/// Device record handed to the host when pairing creates a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDraft {
    /// Display name
    pub name: String,
    /// Stable device data id (the pool id)
    pub id: String,
    pub settings: DeviceSettings,
}
