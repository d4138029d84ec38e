//! Core traits and types for the iopool bridge.
//!
//! This crate defines the seams between the pool integration and the
//! home-automation host that runs it:
//! - **Host collaborators**: settings, capability slots, availability and
//!   device creation, bundled into an explicit [`HostContext`]
//! - **Event bus**: broadcast channel carrying capability, pool mode and
//!   availability changes to flow triggers and other listeners
//! - **Configuration**: defaults, limits and environment variable helpers
//! - **In-memory host**: a complete host implementation for tests and the CLI

pub mod config;
pub mod event;
pub mod eventbus;
pub mod host;
pub mod memory;
pub mod settings;
pub mod value;

// Event exports
pub use event::{EventMetadata, PoolEvent};

// Event bus exports
pub use eventbus::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventBusReceiver, FilterBuilder, FilteredReceiver,
};

pub use host::{
    AvailabilitySink, CapabilitySink, DeviceFactory, DeviceLifecycle, HostContext, HostError,
    HostResult, SettingsStore,
};
pub use memory::{MemoryDevice, MemoryHost};
pub use settings::{ApiKey, DeviceDraft, DeviceSettings};
pub use value::CapabilityValue;
