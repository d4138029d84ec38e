//! Pairing: pick a pool for an API key and create its device.
//!
//! The session keeps no state between steps; the UI passes the key again
//! when creating the device.

use crate::client::PoolApi;
use crate::error::PoolError;
use crate::reading::PoolSummary;
use iopool_core::config::{pairing, polling};
use iopool_core::{ApiKey, DeviceDraft, DeviceFactory, DeviceSettings, HostError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Pairing failures, worded for the pairing UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Missing API key or pool selection.")]
    MissingSelection,

    #[error("Invalid API key or insufficient permissions")]
    InvalidApiKey,

    #[error("Network error while contacting iopool API")]
    Network,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("Unexpected API response")]
    UnexpectedResponse,

    #[error("Failed to create device. Maybe it already exists?")]
    DeviceExists,

    #[error("Failed to create device: {0}")]
    CreateFailed(String),
}

impl From<PoolError> for PairingError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::MissingCredentials => PairingError::MissingApiKey,
            PoolError::Unauthorized(_) => PairingError::InvalidApiKey,
            PoolError::Network(_) | PoolError::InvalidEndpoint(_) => PairingError::Network,
            PoolError::Http(status) => PairingError::Http(status),
            PoolError::NotFound(_) => PairingError::Http(404),
            PoolError::NoPools | PoolError::Parse(_) => PairingError::UnexpectedResponse,
        }
    }
}

impl From<HostError> for PairingError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::AlreadyExists(_) => PairingError::DeviceExists,
            other => PairingError::CreateFailed(other.to_string()),
        }
    }
}

/// One pairing flow against the iopool API and the host.
pub struct PairingSession {
    api: Arc<dyn PoolApi>,
    factory: Arc<dyn DeviceFactory>,
}

impl PairingSession {
    pub fn new(api: Arc<dyn PoolApi>, factory: Arc<dyn DeviceFactory>) -> Self {
        info!("Pairing session started");
        Self { api, factory }
    }

    /// Pools visible to `api_key`, in API order.
    pub async fn list_pools(&self, api_key: &str) -> Result<Vec<PoolSummary>, PairingError> {
        let key = ApiKey::new(api_key);
        if key.is_blank() {
            return Err(PairingError::MissingApiKey);
        }

        self.api.list_pools(&key).await.map_err(|e| {
            warn!("Pair getPools failed: {}", e);
            PairingError::from(e)
        })
    }

    /// Create the device for the selected pool.
    ///
    /// The device id is the pool id. New devices poll every
    /// [`polling::PAIRING_INTERVAL_MINUTES`] minutes.
    pub async fn create_device(
        &self,
        api_key: &str,
        pool_id: &str,
        name: Option<&str>,
    ) -> Result<DeviceDraft, PairingError> {
        let key = ApiKey::new(api_key);
        let pool_id = pool_id.trim();
        if key.is_blank() || pool_id.is_empty() {
            return Err(PairingError::MissingSelection);
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(pairing::DEFAULT_DEVICE_NAME);

        let draft = DeviceDraft {
            name: name.to_string(),
            id: pool_id.to_string(),
            settings: DeviceSettings::new(key, pool_id)
                .with_polling_interval(polling::PAIRING_INTERVAL_MINUTES),
        };

        self.factory.create_device(draft.clone()).await.map_err(|e| {
            warn!(pool_id = %pool_id, "createDevice error: {}", e);
            PairingError::from(e)
        })?;

        info!(pool_id = %pool_id, name = %draft.name, "Device created");
        Ok(draft)
    }
}

impl Drop for PairingSession {
    fn drop(&mut self) {
        info!("Pairing session ended");
    }
}
