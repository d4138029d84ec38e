//! Edge-triggered device availability.
//!
//! The host is told about availability only when it actually changes:
//! repeated failures while unavailable, or repeated successes while
//! available, make no host call.

use iopool_core::{AvailabilitySink, HostContext, PoolEvent};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const EVENT_SOURCE: &str = "availability";

/// Availability as last reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Tracks and reports the availability of one device.
///
/// Starts as available, matching a freshly loaded host device.
pub struct AvailabilityTracker {
    ctx: HostContext,
    // Held across the host call so concurrent cycles cannot both notify.
    state: Mutex<Availability>,
}

impl AvailabilityTracker {
    pub fn new(ctx: HostContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(Availability::Available),
        }
    }

    pub async fn current(&self) -> Availability {
        self.state.lock().await.clone()
    }

    /// Report success. Returns `true` if this was a transition.
    pub async fn mark_available(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.is_available() {
            return false;
        }

        let device_id = self.ctx.device_id();
        if let Err(e) = self.ctx.availability.set_available().await {
            error!(device_id = %device_id, "Failed to set device available: {}", e);
        }
        *state = Availability::Available;
        info!(device_id = %device_id, "Device available");

        self.ctx
            .event_bus
            .publish_with_source(
                PoolEvent::AvailabilityChanged {
                    device_id: device_id.to_string(),
                    available: true,
                    reason: None,
                    timestamp: chrono::Utc::now().timestamp(),
                },
                EVENT_SOURCE,
            )
            .await;
        true
    }

    /// Report failure. Returns `true` if this was a transition.
    ///
    /// While already unavailable, the first reason stays in place.
    pub async fn mark_unavailable(&self, reason: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_available() {
            return false;
        }

        let device_id = self.ctx.device_id();
        if let Err(e) = self.ctx.availability.set_unavailable(reason).await {
            error!(device_id = %device_id, "Failed to set device unavailable: {}", e);
        }
        *state = Availability::Unavailable(reason.to_string());
        warn!(device_id = %device_id, reason, "Device unavailable");

        self.ctx
            .event_bus
            .publish_with_source(
                PoolEvent::AvailabilityChanged {
                    device_id: device_id.to_string(),
                    available: false,
                    reason: Some(reason.to_string()),
                    timestamp: chrono::Utc::now().timestamp(),
                },
                EVENT_SOURCE,
            )
            .await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iopool_core::{DeviceSettings, EventBus, MemoryDevice};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryDevice>, AvailabilityTracker) {
        let device = Arc::new(MemoryDevice::new("Pool", DeviceSettings::default()));
        let ctx = HostContext::from_device("pool-1", device.clone(), EventBus::new());
        (device, AvailabilityTracker::new(ctx))
    }

    #[tokio::test]
    async fn test_repeated_failures_notify_once() {
        let (device, tracker) = setup();

        assert!(!tracker.mark_available().await);
        assert!(tracker.mark_unavailable("API error: HTTP 500").await);
        assert!(!tracker.mark_unavailable("API error: HTTP 502").await);
        assert!(!tracker.mark_unavailable("API error: HTTP 503").await);

        assert_eq!(device.unavailable_calls(), 1);
        assert_eq!(device.available_calls(), 0);
        assert_eq!(
            tracker.current().await,
            Availability::Unavailable("API error: HTTP 500".to_string())
        );
    }

    #[tokio::test]
    async fn test_recovery_notifies_once() {
        let (device, tracker) = setup();

        tracker.mark_unavailable("down").await;
        assert!(tracker.mark_available().await);
        assert!(!tracker.mark_available().await);

        assert_eq!(device.available_calls(), 1);
        assert!(device.is_available());
        assert!(tracker.current().await.is_available());
    }

    #[tokio::test]
    async fn test_transitions_are_published() {
        let (_device, tracker) = setup();
        let mut rx = tracker.ctx.event_bus.filter().availability_changes();

        tracker.mark_unavailable("down").await;
        tracker.mark_unavailable("still down").await;
        tracker.mark_available().await;

        let (first, meta) = rx.try_recv().unwrap();
        assert!(matches!(first, PoolEvent::AvailabilityChanged { available: false, .. }));
        assert_eq!(meta.source, "availability");
        let (second, _) = rx.try_recv().unwrap();
        assert!(matches!(second, PoolEvent::AvailabilityChanged { available: true, .. }));
        assert!(rx.try_recv().is_none());
    }
}
