//! Periodic poll scheduling.
//!
//! A scheduler owns at most one periodic job. Starting it again replaces the
//! running job; stopping or dropping it aborts the job, so a deleted device
//! never leaves a task behind. After [`PollScheduler::shutdown`] it refuses
//! to start again.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

#[derive(Default)]
struct SchedulerState {
    handle: Option<JoinHandle<()>>,
    closed: bool,
}

/// Periodic job runner, idle or active.
pub struct PollScheduler {
    name: String,
    state: Mutex<SchedulerState>,
}

impl PollScheduler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Run `job` now, then once per `period`.
    ///
    /// Any job already scheduled is cancelled first. Runs never overlap:
    /// a tick that comes due while `job` is still running is skipped.
    /// Returns `false`, scheduling nothing, once the scheduler is shut down.
    pub fn start<F, Fut>(&self, period: Duration, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Held until the new handle is stored so shutdown cannot interleave.
        let mut state = self.state.lock();
        if state.closed {
            debug!(scheduler = %self.name, "Scheduler shut down, not starting");
            return false;
        }

        let name = self.name.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                debug!(scheduler = %name, "Poll tick");
                job().await;
            }
        });

        if let Some(previous) = state.handle.replace(task) {
            previous.abort();
            debug!(scheduler = %self.name, "Replaced running poll job");
        }
        debug!(scheduler = %self.name, period_secs = period.as_secs(), "Poll job scheduled");
        true
    }

    /// Cancel the job, if any. Returns `true` if one was running.
    pub fn stop(&self) -> bool {
        let handle = self.state.lock().handle.take();
        match handle {
            Some(handle) => {
                handle.abort();
                debug!(scheduler = %self.name, "Poll job cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel the job and refuse every later start.
    pub fn shutdown(&self) {
        let handle = {
            let mut state = self.state.lock();
            state.closed = true;
            state.handle.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        debug!(scheduler = %self.name, "Scheduler shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().closed
    }

    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().handle.take() {
            handle.abort();
        }
    }
}
