//! Publishing readings into host capability slots.

use crate::reading::{capabilities, Reading};
use futures::future::join_all;
use iopool_core::{CapabilitySink, CapabilityValue, HostContext, PoolEvent};
use tracing::{debug, error, info};

const EVENT_SOURCE: &str = "publisher";

/// Outcome of publishing one reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    /// Slots written successfully
    pub written: Vec<&'static str>,
    /// Slots whose write the host rejected
    pub failed: Vec<&'static str>,
    /// Set when `pool_mode` changed value
    pub mode_changed: bool,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes readings to the capability slots of one device.
pub struct CapabilityPublisher {
    ctx: HostContext,
}

impl CapabilityPublisher {
    pub fn new(ctx: HostContext) -> Self {
        Self { ctx }
    }

    /// Write every present field of `reading`.
    ///
    /// Absent fields are left untouched. Writes run concurrently; a failed
    /// write is logged and never prevents the others.
    pub async fn publish(&self, reading: &Reading) -> PublishReport {
        let device_id = self.ctx.device_id();
        let previous_mode = self
            .ctx
            .capabilities
            .capability(capabilities::POOL_MODE)
            .and_then(|v| v.as_str().map(str::to_string));

        let values = reading.capability_values();
        let writes = values.iter().map(|(name, value)| async move {
            let result = self.ctx.capabilities.set_capability(name, value.clone()).await;
            (*name, value, result)
        });

        let mut report = PublishReport::default();
        for (name, value, result) in join_all(writes).await {
            match result {
                Ok(()) => {
                    debug!(device_id = %device_id, capability = name, value = %value, "Capability updated");
                    report.written.push(name);
                    self.ctx
                        .event_bus
                        .publish_with_source(
                            PoolEvent::CapabilityChanged {
                                device_id: device_id.to_string(),
                                capability: name.to_string(),
                                value: value.clone(),
                                timestamp: chrono::Utc::now().timestamp(),
                            },
                            EVENT_SOURCE,
                        )
                        .await;
                }
                Err(e) => {
                    error!(device_id = %device_id, capability = name, "Failed to set capability: {}", e);
                    report.failed.push(name);
                }
            }
        }

        if let Some(mode) = reading.mode {
            let mode_written = report.written.contains(&capabilities::POOL_MODE);
            if mode_written && previous_mode.as_deref() != Some(mode.as_str()) {
                info!(
                    device_id = %device_id,
                    mode = %mode,
                    previous = previous_mode.as_deref().unwrap_or("-"),
                    "Pool mode changed"
                );
                report.mode_changed = true;
                self.ctx
                    .event_bus
                    .publish_with_source(
                        PoolEvent::PoolModeChanged {
                            device_id: device_id.to_string(),
                            mode: mode.as_str().to_string(),
                            previous: previous_mode,
                            timestamp: chrono::Utc::now().timestamp(),
                        },
                        EVENT_SOURCE,
                    )
                    .await;
            }
        }

        report
    }
}

/// Current value of a numeric slot.
pub(crate) fn number_capability(ctx: &HostContext, name: &str) -> Option<f64> {
    ctx.capabilities.capability(name).as_ref().and_then(CapabilityValue::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::PoolMode;
    use iopool_core::{DeviceSettings, EventBus, MemoryDevice};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryDevice>, HostContext) {
        let device = Arc::new(MemoryDevice::new("Pool", DeviceSettings::new("key", "pool-1")));
        let ctx = HostContext::from_device("pool-1", device.clone(), EventBus::new());
        (device, ctx)
    }

    #[tokio::test]
    async fn test_only_present_fields_are_written() {
        let (device, ctx) = setup();
        let publisher = CapabilityPublisher::new(ctx);

        let reading = Reading {
            temperature: Some(21.0),
            ..Reading::default()
        };
        let report = publisher.publish(&reading).await;

        assert_eq!(report.written, vec![capabilities::TEMPERATURE]);
        assert_eq!(device.capability_writes(), vec![capabilities::TEMPERATURE.to_string()]);
        assert_eq!(device.capabilities().len(), 1);
    }

    #[tokio::test]
    async fn test_absent_fields_keep_previous_values() {
        let (device, ctx) = setup();
        let publisher = CapabilityPublisher::new(ctx);

        publisher
            .publish(&Reading {
                ph: Some(7.4),
                orp: Some(700.0),
                ..Reading::default()
            })
            .await;
        publisher
            .publish(&Reading {
                ph: Some(7.1),
                ..Reading::default()
            })
            .await;

        assert_eq!(device.capability(capabilities::PH), Some(CapabilityValue::Number(7.1)));
        assert_eq!(device.capability(capabilities::ORP), Some(CapabilityValue::Number(700.0)));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_block_others() {
        let (device, ctx) = setup();
        device.fail_capability(capabilities::PH);
        let publisher = CapabilityPublisher::new(ctx);

        let report = publisher
            .publish(&Reading {
                temperature: Some(25.0),
                ph: Some(7.0),
                action_required: Some(true),
                ..Reading::default()
            })
            .await;

        assert_eq!(report.failed, vec![capabilities::PH]);
        assert_eq!(report.written.len(), 2);
        assert!(!report.is_complete());
        assert_eq!(
            device.capability(capabilities::ACTION_REQUIRED),
            Some(CapabilityValue::Boolean(true))
        );
    }

    #[tokio::test]
    async fn test_mode_change_is_published_once() {
        let (_device, ctx) = setup();
        let mut rx = ctx.event_bus.filter().pool_mode_changes();
        let publisher = CapabilityPublisher::new(ctx);

        let winter = Reading {
            mode: Some(PoolMode::Winter),
            ..Reading::default()
        };
        assert!(publisher.publish(&winter).await.mode_changed);
        assert!(!publisher.publish(&winter).await.mode_changed);

        let (event, meta) = rx.try_recv().unwrap();
        assert_eq!(meta.source, "publisher");
        assert_eq!(
            event,
            PoolEvent::PoolModeChanged {
                device_id: "pool-1".to_string(),
                mode: "WINTER".to_string(),
                previous: None,
                timestamp: event.timestamp(),
            }
        );
        assert!(rx.try_recv().is_none());
    }
}
