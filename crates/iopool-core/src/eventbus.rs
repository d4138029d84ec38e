//! Event bus for pool devices.
//!
//! Devices publish capability, pool mode and availability changes here;
//! flow triggers and the CLI subscribe to them.

use crate::event::{EventMetadata, PoolEvent};
use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Event bus backed by a broadcast channel.
///
/// Every subscriber receives every event published after it subscribed.
/// Slow subscribers lose the oldest events instead of blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(PoolEvent, EventMetadata)>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event with default metadata.
    ///
    /// Returns `true` if there was at least one subscriber.
    pub async fn publish(&self, event: PoolEvent) -> bool {
        self.publish_with_source(event, "device").await
    }

    /// Publish an event tagged with the component that raised it.
    pub async fn publish_with_source(&self, event: PoolEvent, source: impl Into<String>) -> bool {
        self.tx.send((event, EventMetadata::new(source))).is_ok()
    }

    /// Subscribe to all events.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Create a filtered subscription helper for common patterns.
    pub fn filter(&self) -> FilterBuilder {
        FilterBuilder {
            tx: self.tx.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for all events from the event bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(PoolEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the event bus is closed.
    pub async fn recv(&mut self) -> Option<(PoolEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event bus receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<(PoolEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver for filtered events from the event bus.
pub struct FilteredReceiver<F>
where
    F: Fn(&PoolEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(PoolEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&PoolEvent) -> bool + Send,
{
    fn new(rx: broadcast::Receiver<(PoolEvent, EventMetadata)>, filter: F) -> Self {
        Self { rx, filter }
    }

    /// Receive the next event matching the filter.
    ///
    /// Returns `None` if the event bus is closed.
    pub async fn recv(&mut self) -> Option<(PoolEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<(PoolEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }
}

/// Builder for creating filtered subscriptions.
pub struct FilterBuilder {
    tx: broadcast::Sender<(PoolEvent, EventMetadata)>,
}

impl FilterBuilder {
    /// Subscribe to pool mode changes of every device.
    pub fn pool_mode_changes(&self) -> FilteredReceiver<fn(&PoolEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), PoolEvent::is_pool_mode_change)
    }

    /// Subscribe to availability changes of every device.
    pub fn availability_changes(&self) -> FilteredReceiver<fn(&PoolEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), PoolEvent::is_availability_change)
    }

    /// Subscribe to every event of one device.
    pub fn device(
        &self,
        device_id: impl Into<String>,
    ) -> FilteredReceiver<impl Fn(&PoolEvent) -> bool + Send + 'static> {
        let target = device_id.into();
        FilteredReceiver::new(self.tx.subscribe(), move |event: &PoolEvent| {
            event.device_id() == target
        })
    }

    /// Subscribe with a custom filter function.
    pub fn custom<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&PoolEvent) -> bool + Send + 'static,
    {
        FilteredReceiver::new(self.tx.subscribe(), filter)
    }
}
