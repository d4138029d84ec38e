//! iopool pool device.
//!
//! A [`PoolDevice`] binds one host device to one iopool pool. The host drives
//! it through [`DeviceLifecycle`]; every poll cycle reads the current
//! settings, fetches the pool detail and publishes it, turning any failure
//! into an availability transition instead of an error.

use crate::availability::AvailabilityTracker;
use crate::client::PoolApi;
use crate::error::PoolError;
use crate::publisher::{CapabilityPublisher, PublishReport};
use crate::scheduler::PollScheduler;
use async_trait::async_trait;
use iopool_core::settings::keys;
use iopool_core::{ApiKey, DeviceLifecycle, HostContext, SettingsStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Reading fetched and published
    Published(PublishReport),
    /// Fetch failed; the device is unavailable
    Failed(PoolError),
    /// Nothing fetched
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle was still running
    InProgress,
    /// The API rejected the key; waiting for new settings
    AuthBlocked,
}

/// Resets the in-progress flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fetch-and-publish cycle of one device.
pub struct Poller {
    ctx: HostContext,
    api: Arc<dyn PoolApi>,
    publisher: CapabilityPublisher,
    tracker: AvailabilityTracker,
    in_progress: AtomicBool,
    auth_blocked: AtomicBool,
}

impl Poller {
    pub fn new(ctx: HostContext, api: Arc<dyn PoolApi>) -> Self {
        Self {
            publisher: CapabilityPublisher::new(ctx.clone()),
            tracker: AvailabilityTracker::new(ctx.clone()),
            ctx,
            api,
            in_progress: AtomicBool::new(false),
            auth_blocked: AtomicBool::new(false),
        }
    }

    pub fn tracker(&self) -> &AvailabilityTracker {
        &self.tracker
    }

    pub fn is_auth_blocked(&self) -> bool {
        self.auth_blocked.load(Ordering::Acquire)
    }

    /// Allow fetching again after an auth failure.
    pub fn clear_auth_block(&self) {
        if self.auth_blocked.swap(false, Ordering::AcqRel) {
            debug!(device_id = %self.ctx.device_id(), "Auth block cleared");
        }
    }

    /// Run one cycle. Never fails; the outcome is for logs and tests.
    pub async fn poll(&self) -> CycleOutcome {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            debug!(device_id = %self.ctx.device_id(), "Poll already in progress, skipping");
            return CycleOutcome::Skipped(SkipReason::InProgress);
        }
        let _guard = CycleGuard(&self.in_progress);

        self.run_cycle().await
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let device_id = self.ctx.device_id();
        let settings = self.ctx.settings.settings().normalized();

        let Some(api_key) = settings.api_key().cloned() else {
            let err = PoolError::MissingCredentials;
            info!(device_id = %device_id, "{}", err);
            self.tracker.mark_unavailable(&err.unavailable_reason()).await;
            return CycleOutcome::Failed(err);
        };

        if self.is_auth_blocked() {
            debug!(device_id = %device_id, "API key rejected earlier, waiting for new settings");
            return CycleOutcome::Skipped(SkipReason::AuthBlocked);
        }

        let result = match settings.pool_id() {
            Some(pool_id) => self.api.pool_detail(&api_key, pool_id).await,
            None => match self.discover_pool(&api_key).await {
                Ok(pool_id) => self.api.pool_detail(&api_key, &pool_id).await,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(reading) => {
                self.tracker.mark_available().await;
                if reading.is_empty() {
                    debug!(device_id = %device_id, "Pool detail carried no usable field");
                }
                CycleOutcome::Published(self.publisher.publish(&reading).await)
            }
            Err(e) => {
                warn!(device_id = %device_id, "Polling error: {}", e);
                if e.is_auth_failure() {
                    self.auth_blocked.store(true, Ordering::Release);
                }
                self.tracker.mark_unavailable(&e.unavailable_reason()).await;
                CycleOutcome::Failed(e)
            }
        }
    }

    /// Pick the first pool of the key and persist it as the device's pool.
    async fn discover_pool(&self, api_key: &ApiKey) -> Result<String, PoolError> {
        let device_id = self.ctx.device_id();
        let pools = self.api.list_pools(api_key).await?;
        let pool = pools.into_iter().next().ok_or(PoolError::NoPools)?;

        info!(device_id = %device_id, pool_id = %pool.id, pool_name = %pool.name, "No pool configured, using first pool of API key");
        if let Err(e) = self.ctx.settings.set_pool_id(&pool.id).await {
            error!(device_id = %device_id, "Failed to persist discovered pool id: {}", e);
        }
        Ok(pool.id)
    }
}

/// Setting keys whose change restarts polling.
const RESTART_KEYS: [&str; 3] = [keys::API_KEY, keys::POOL_ID, keys::POLLING_INTERVAL];

/// Host device bound to one iopool pool.
pub struct PoolDevice {
    ctx: HostContext,
    poller: Arc<Poller>,
    scheduler: PollScheduler,
}

impl PoolDevice {
    pub fn new(ctx: HostContext, api: Arc<dyn PoolApi>) -> Self {
        let scheduler = PollScheduler::new(format!("iopool:{}", ctx.device_id()));
        Self {
            poller: Arc::new(Poller::new(ctx.clone(), api)),
            ctx,
            scheduler,
        }
    }

    pub fn device_id(&self) -> &str {
        self.ctx.device_id()
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn is_deleted(&self) -> bool {
        self.scheduler.is_shut_down()
    }

    /// Poll interval from the current settings.
    pub fn polling_period(&self) -> Duration {
        let minutes = self.ctx.settings.settings().effective_interval_minutes();
        Duration::from_secs(minutes.saturating_mul(60))
    }

    /// (Re)start polling: one cycle now, then one per interval.
    ///
    /// Does nothing once the device is deleted.
    fn start_polling(&self) {
        let period = self.polling_period();
        let poller = self.poller.clone();
        let started = self.scheduler.start(period, move || {
            let poller = poller.clone();
            async move {
                poller.poll().await;
            }
        });
        if started {
            info!(device_id = %self.device_id(), interval_minutes = period.as_secs() / 60, "Polling started");
        }
    }
}

#[async_trait]
impl DeviceLifecycle for PoolDevice {
    async fn initialize(&self) {
        if self.is_deleted() {
            return;
        }
        info!(device_id = %self.device_id(), "Device has been initialized");
        self.start_polling();
    }

    async fn handle_settings_change(&self, changed_keys: &[String]) {
        if self.is_deleted() {
            return;
        }
        info!(device_id = %self.device_id(), ?changed_keys, "Settings changed");

        self.poller.clear_auth_block();
        if changed_keys.iter().any(|k| RESTART_KEYS.contains(&k.as_str())) {
            self.start_polling();
        }
    }

    async fn teardown(&self) {
        self.scheduler.shutdown();
        info!(device_id = %self.device_id(), "Device deleted");
    }
}
