//! Host collaborator interfaces.
//!
//! The home-automation host owns device settings, capability storage,
//! availability flags and device creation. The bridge only talks to it
//! through these traits, bundled per device into a [`HostContext`].

use crate::eventbus::EventBus;
use crate::settings::{DeviceDraft, DeviceSettings};
use crate::value::CapabilityValue;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Error type for host operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// A device with the same data id already exists
    #[error("Device already exists: {0}")]
    AlreadyExists(String),

    /// The device has no such capability slot
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// The host refused the operation
    #[error("Host rejected operation: {0}")]
    Rejected(String),
}

/// Settings persisted by the host for one device.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings.
    fn settings(&self) -> DeviceSettings;

    /// Persist a pool id chosen without user input.
    async fn set_pool_id(&self, pool_id: &str) -> HostResult<()>;
}

/// Capability slots of one device.
#[async_trait]
pub trait CapabilitySink: Send + Sync {
    /// Last value written to a slot.
    fn capability(&self, name: &str) -> Option<CapabilityValue>;

    async fn set_capability(&self, name: &str, value: CapabilityValue) -> HostResult<()>;
}

/// Availability flag of one device.
#[async_trait]
pub trait AvailabilitySink: Send + Sync {
    async fn set_available(&self) -> HostResult<()>;

    async fn set_unavailable(&self, reason: &str) -> HostResult<()>;
}

/// Device creation, used by pairing.
#[async_trait]
pub trait DeviceFactory: Send + Sync {
    async fn create_device(&self, draft: DeviceDraft) -> HostResult<()>;
}

/// Lifecycle hooks the host invokes on a device.
#[async_trait]
pub trait DeviceLifecycle: Send + Sync {
    /// Called once when the device is loaded.
    async fn initialize(&self);

    /// Called after the user saved new settings.
    async fn handle_settings_change(&self, changed_keys: &[String]);

    /// Called when the device is deleted. Terminal.
    async fn teardown(&self);
}

/// Everything a device needs from its host.
#[derive(Clone)]
pub struct HostContext {
    device_id: String,
    pub settings: Arc<dyn SettingsStore>,
    pub capabilities: Arc<dyn CapabilitySink>,
    pub availability: Arc<dyn AvailabilitySink>,
    pub event_bus: EventBus,
}

impl HostContext {
    pub fn new(
        device_id: impl Into<String>,
        settings: Arc<dyn SettingsStore>,
        capabilities: Arc<dyn CapabilitySink>,
        availability: Arc<dyn AvailabilitySink>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            settings,
            capabilities,
            availability,
            event_bus,
        }
    }

    /// Build a context from one object implementing every device-side trait.
    pub fn from_device<D>(device_id: impl Into<String>, device: Arc<D>, event_bus: EventBus) -> Self
    where
        D: SettingsStore + CapabilitySink + AvailabilitySink + 'static,
    {
        Self::new(
            device_id,
            device.clone(),
            device.clone(),
            device,
            event_bus,
        )
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}
