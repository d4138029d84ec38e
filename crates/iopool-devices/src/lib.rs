//! iopool Pool Device Crate
//!
//! This crate turns iopool pool telemetry into host device state.
//!
//! ## Architecture
//!
//! - **IopoolClient**: HTTP access to the iopool API (`PoolApi`)
//! - **Reading**: field mapping from the pool detail JSON
//! - **CapabilityPublisher**: writes readings into capability slots
//! - **AvailabilityTracker**: edge-triggered availability reporting
//! - **PollScheduler**: one periodic poll job per device
//! - **PoolDevice**: the device lifecycle tying the above together
//! - **PairingSession**: pool selection and device creation
//!
//! Host access goes through `iopool_core::HostContext`.

pub mod availability;
pub mod client;
pub mod device;
pub mod error;
pub mod flow;
pub mod mode;
pub mod pairing;
pub mod publisher;
pub mod reading;
pub mod scheduler;

pub use availability::{Availability, AvailabilityTracker};
pub use client::{ClientConfig, IopoolClient, PoolApi};
pub use device::{CycleOutcome, PoolDevice, Poller, SkipReason};
pub use error::{PoolError, PoolResult};
pub use flow::{
    action_required, get_filtration_duration, FiltrationDurationToken, PoolModeChange,
    PoolModeTrigger,
};
pub use mode::{normalize_mode, PoolMode, UnknownMode};
pub use pairing::{PairingError, PairingSession};
pub use publisher::{CapabilityPublisher, PublishReport};
pub use reading::{capabilities, PoolSummary, Reading};
pub use scheduler::PollScheduler;
