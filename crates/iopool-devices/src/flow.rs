//! Automation cards backed by a device's capability slots.

use crate::mode::{normalize_mode, PoolMode};
use crate::publisher::number_capability;
use crate::reading::capabilities;
use iopool_core::{
    CapabilitySink, CapabilityValue, EventBus, FilteredReceiver, HostContext, PoolEvent,
};
use serde::{Deserialize, Serialize};

/// Condition card: true only when `alarm_generic` holds `true`.
pub fn action_required(ctx: &HostContext) -> bool {
    matches!(
        ctx.capabilities.capability(capabilities::ACTION_REQUIRED),
        Some(CapabilityValue::Boolean(true))
    )
}

/// Token returned by the "get filtration duration" action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiltrationDurationToken {
    pub duration_hours: f64,
}

/// Action card: recommended filtration hours, 0 when unknown.
pub fn get_filtration_duration(ctx: &HostContext) -> FiltrationDurationToken {
    FiltrationDurationToken {
        duration_hours: number_capability(ctx, capabilities::FILTRATION_DURATION).unwrap_or(0.0),
    }
}

/// One "pool mode changed" trigger firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolModeChange {
    pub device_id: String,
    pub mode: PoolMode,
    pub previous: Option<PoolMode>,
}

type ModeFilter = Box<dyn Fn(&PoolEvent) -> bool + Send>;

/// Trigger card: yields pool mode changes from the event bus.
pub struct PoolModeTrigger {
    rx: FilteredReceiver<ModeFilter>,
}

impl PoolModeTrigger {
    /// Listen for mode changes of `device_id`, or of every device.
    pub fn subscribe(bus: &EventBus, device_id: Option<&str>) -> Self {
        let device_id = device_id.map(str::to_string);
        let filter: ModeFilter = Box::new(move |event: &PoolEvent| {
            event.is_pool_mode_change()
                && device_id.as_deref().is_none_or(|id| event.device_id() == id)
        });
        Self {
            rx: bus.filter().custom(filter),
        }
    }

    /// Next mode change. `None` once the bus is closed.
    pub async fn next(&mut self) -> Option<PoolModeChange> {
        loop {
            let (event, _) = self.rx.recv().await?;
            if let Some(change) = Self::to_change(event) {
                return Some(change);
            }
        }
    }

    fn to_change(event: PoolEvent) -> Option<PoolModeChange> {
        match event {
            PoolEvent::PoolModeChanged {
                device_id,
                mode,
                previous,
                ..
            } => Some(PoolModeChange {
                device_id,
                mode: normalize_mode(&mode)?,
                previous: previous.as_deref().and_then(normalize_mode),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::CapabilityPublisher;
    use crate::reading::Reading;
    use iopool_core::{DeviceSettings, MemoryDevice};
    use std::sync::Arc;

    fn setup(id: &str, bus: &EventBus) -> (Arc<MemoryDevice>, HostContext) {
        let device = Arc::new(MemoryDevice::new("Pool", DeviceSettings::new("key", id)));
        let ctx = HostContext::from_device(id, device.clone(), bus.clone());
        (device, ctx)
    }

    #[tokio::test]
    async fn test_action_required_reads_alarm_slot() {
        let (device, ctx) = setup("pool-1", &EventBus::new());
        assert!(!action_required(&ctx));

        device
            .set_capability(capabilities::ACTION_REQUIRED, CapabilityValue::Boolean(true))
            .await
            .unwrap();
        assert!(action_required(&ctx));

        device
            .set_capability(capabilities::ACTION_REQUIRED, CapabilityValue::Text("true".into()))
            .await
            .unwrap();
        assert!(!action_required(&ctx));
    }

    #[tokio::test]
    async fn test_filtration_duration_defaults_to_zero() {
        let (device, ctx) = setup("pool-1", &EventBus::new());
        assert_eq!(get_filtration_duration(&ctx).duration_hours, 0.0);

        device
            .set_capability(capabilities::FILTRATION_DURATION, CapabilityValue::Number(6.5))
            .await
            .unwrap();
        let token = get_filtration_duration(&ctx);
        assert_eq!(token.duration_hours, 6.5);
        assert_eq!(
            serde_json::to_value(token).unwrap(),
            serde_json::json!({ "duration_hours": 6.5 })
        );
    }

    #[tokio::test]
    async fn test_trigger_fires_for_its_device_only() {
        let bus = EventBus::new();
        let (_a, ctx_a) = setup("pool-a", &bus);
        let (_b, ctx_b) = setup("pool-b", &bus);
        let mut trigger = PoolModeTrigger::subscribe(&bus, Some("pool-b"));

        let winter = Reading {
            mode: Some(PoolMode::Winter),
            temperature: Some(8.0),
            ..Reading::default()
        };
        CapabilityPublisher::new(ctx_a).publish(&winter).await;
        CapabilityPublisher::new(ctx_b.clone()).publish(&winter).await;
        CapabilityPublisher::new(ctx_b)
            .publish(&Reading {
                mode: Some(PoolMode::Standard),
                ..Reading::default()
            })
            .await;

        let first = trigger.next().await.unwrap();
        assert_eq!(first.device_id, "pool-b");
        assert_eq!(first.mode, PoolMode::Winter);
        assert_eq!(first.previous, None);

        let second = trigger.next().await.unwrap();
        assert_eq!(second.mode, PoolMode::Standard);
        assert_eq!(second.previous, Some(PoolMode::Winter));
    }
}
