//! In-memory host.
//!
//! [`MemoryDevice`] keeps the settings, capability slots and availability of
//! one device; [`MemoryHost`] creates and stores them. Used by the CLI and by
//! tests, which can also inject write failures and inspect call counts.

use crate::host::{AvailabilitySink, CapabilitySink, DeviceFactory, HostError, HostResult, SettingsStore};
use crate::settings::{DeviceDraft, DeviceSettings};
use crate::value::CapabilityValue;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One device held in memory.
#[derive(Debug)]
pub struct MemoryDevice {
    name: String,
    settings: RwLock<DeviceSettings>,
    capabilities: RwLock<HashMap<String, CapabilityValue>>,
    /// Capability writes in call order, failed ones included
    writes: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    available: RwLock<bool>,
    unavailable_reason: RwLock<Option<String>>,
    available_calls: AtomicUsize,
    unavailable_calls: AtomicUsize,
}

impl MemoryDevice {
    pub fn new(name: impl Into<String>, settings: DeviceSettings) -> Self {
        Self {
            name: name.into(),
            settings: RwLock::new(settings),
            capabilities: RwLock::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            available: RwLock::new(true),
            unavailable_reason: RwLock::new(None),
            available_calls: AtomicUsize::new(0),
            unavailable_calls: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the settings, as the host does when the user saves them.
    pub fn update_settings(&self, settings: DeviceSettings) {
        *self.settings.write() = settings;
    }

    /// Make every future write to `name` fail.
    pub fn fail_capability(&self, name: impl Into<String>) {
        self.failing.lock().insert(name.into());
    }

    /// Capability names written so far, in call order.
    pub fn capability_writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn capabilities(&self) -> HashMap<String, CapabilityValue> {
        self.capabilities.read().clone()
    }

    pub fn is_available(&self) -> bool {
        *self.available.read()
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        self.unavailable_reason.read().clone()
    }

    /// Number of `set_available` calls received.
    pub fn available_calls(&self) -> usize {
        self.available_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_unavailable` calls received.
    pub fn unavailable_calls(&self) -> usize {
        self.unavailable_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MemoryDevice {
    fn settings(&self) -> DeviceSettings {
        self.settings.read().clone()
    }

    async fn set_pool_id(&self, pool_id: &str) -> HostResult<()> {
        self.settings.write().pool_id = pool_id.to_string();
        Ok(())
    }
}

#[async_trait]
impl CapabilitySink for MemoryDevice {
    fn capability(&self, name: &str) -> Option<CapabilityValue> {
        self.capabilities.read().get(name).cloned()
    }

    async fn set_capability(&self, name: &str, value: CapabilityValue) -> HostResult<()> {
        self.writes.lock().push(name.to_string());
        if self.failing.lock().contains(name) {
            return Err(HostError::Rejected(format!("write to '{}' refused", name)));
        }
        self.capabilities.write().insert(name.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl AvailabilitySink for MemoryDevice {
    async fn set_available(&self) -> HostResult<()> {
        self.available_calls.fetch_add(1, Ordering::SeqCst);
        *self.available.write() = true;
        *self.unavailable_reason.write() = None;
        Ok(())
    }

    async fn set_unavailable(&self, reason: &str) -> HostResult<()> {
        self.unavailable_calls.fetch_add(1, Ordering::SeqCst);
        *self.available.write() = false;
        *self.unavailable_reason.write() = Some(reason.to_string());
        Ok(())
    }
}

/// Host holding every created device in memory, keyed by device data id.
#[derive(Debug, Default)]
pub struct MemoryHost {
    devices: RwLock<HashMap<String, Arc<MemoryDevice>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self, id: &str) -> Option<Arc<MemoryDevice>> {
        self.devices.read().get(id).cloned()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Remove a device, as the host does when the user deletes it.
    pub fn remove_device(&self, id: &str) -> Option<Arc<MemoryDevice>> {
        self.devices.write().remove(id)
    }
}

#[async_trait]
impl DeviceFactory for MemoryHost {
    async fn create_device(&self, draft: DeviceDraft) -> HostResult<()> {
        let mut devices = self.devices.write();
        if devices.contains_key(&draft.id) {
            return Err(HostError::AlreadyExists(draft.id));
        }
        let device = Arc::new(MemoryDevice::new(draft.name, draft.settings));
        devices.insert(draft.id, device);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capability_roundtrip_and_failure_injection() {
        let device = MemoryDevice::new("pool", DeviceSettings::default());
        device.set_capability("measure_ph", 7.1.into()).await.unwrap();
        assert_eq!(device.capability("measure_ph"), Some(CapabilityValue::Number(7.1)));

        device.fail_capability("measure_orp");
        let err = device.set_capability("measure_orp", 650.0.into()).await;
        assert!(matches!(err, Err(HostError::Rejected(_))));
        assert!(device.capability("measure_orp").is_none());
        assert_eq!(device.capability_writes(), vec!["measure_ph", "measure_orp"]);
    }

    #[tokio::test]
    async fn test_availability_counters() {
        let device = MemoryDevice::new("pool", DeviceSettings::default());
        assert!(device.is_available());

        device.set_unavailable("offline").await.unwrap();
        assert!(!device.is_available());
        assert_eq!(device.unavailable_reason().as_deref(), Some("offline"));

        device.set_available().await.unwrap();
        assert!(device.is_available());
        assert_eq!(device.available_calls(), 1);
        assert_eq!(device.unavailable_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_device_rejects_duplicates() {
        let host = MemoryHost::new();
        let draft = DeviceDraft {
            name: "iopool Pool".to_string(),
            id: "pool-1".to_string(),
            settings: DeviceSettings::new("key", "pool-1"),
        };

        host.create_device(draft.clone()).await.unwrap();
        let err = host.create_device(draft).await.unwrap_err();
        assert!(matches!(err, HostError::AlreadyExists(id) if id == "pool-1"));
        assert_eq!(host.device_count(), 1);
        assert_eq!(host.device("pool-1").unwrap().name(), "iopool Pool");
    }

    #[tokio::test]
    async fn test_set_pool_id_persists() {
        let device = MemoryDevice::new("pool", DeviceSettings::new("key", ""));
        device.set_pool_id("pool-9").await.unwrap();
        assert_eq!(device.settings().pool_id, "pool-9");
    }
}
