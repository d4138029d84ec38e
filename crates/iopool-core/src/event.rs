//! Events published by pool devices.
//!
//! Devices publish these on the [`EventBus`](crate::EventBus); flow triggers
//! and the CLI subscribe to the ones they care about.

use crate::value::CapabilityValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PoolEvent {
    /// A capability slot was written
    CapabilityChanged {
        device_id: String,
        capability: String,
        value: CapabilityValue,
        timestamp: i64,
    },

    /// The pool operating mode changed (drives the "pool mode changed" trigger)
    PoolModeChanged {
        device_id: String,
        mode: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<String>,
        timestamp: i64,
    },

    /// The device became available or unavailable
    AvailabilityChanged {
        device_id: String,
        available: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: i64,
    },
}

impl PoolEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CapabilityChanged { .. } => "CapabilityChanged",
            Self::PoolModeChanged { .. } => "PoolModeChanged",
            Self::AvailabilityChanged { .. } => "AvailabilityChanged",
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Self::CapabilityChanged { device_id, .. }
            | Self::PoolModeChanged { device_id, .. }
            | Self::AvailabilityChanged { device_id, .. } => device_id,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::CapabilityChanged { timestamp, .. }
            | Self::PoolModeChanged { timestamp, .. }
            | Self::AvailabilityChanged { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_pool_mode_change(&self) -> bool {
        matches!(self, Self::PoolModeChanged { .. })
    }

    pub fn is_availability_change(&self) -> bool {
        matches!(self, Self::AvailabilityChanged { .. })
    }
}

/// Event metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub event_id: String,
    /// Event source (component that published)
    pub source: String,
    /// Event timestamp
    pub timestamp: i64,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = PoolEvent::PoolModeChanged {
            device_id: "pool-1".to_string(),
            mode: "WINTER".to_string(),
            previous: None,
            timestamp: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PoolModeChanged");
        assert_eq!(json["mode"], "WINTER");
        assert!(json.get("previous").is_none());
    }

    #[test]
    fn test_event_accessors() {
        let event = PoolEvent::AvailabilityChanged {
            device_id: "pool-1".to_string(),
            available: false,
            reason: Some("API error".to_string()),
            timestamp: 42,
        };
        assert_eq!(event.device_id(), "pool-1");
        assert_eq!(event.timestamp(), 42);
        assert!(event.is_availability_change());
        assert!(!event.is_pool_mode_change());
    }

    #[test]
    fn test_metadata_ids_are_unique() {
        let a = EventMetadata::new("test");
        let b = EventMetadata::new("test");
        assert_ne!(a.event_id, b.event_id);
    }
}
