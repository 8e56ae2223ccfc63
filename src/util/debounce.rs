//! Debounce utility for keystroke-triggered work.
//!
//! Suppresses intermediate calls and runs only the latest one after a quiet
//! period. Callers hold an explicit handle instead of relying on a timer
//! captured somewhere in a closure.

use std::sync::Mutex;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Schedules futures after a quiet period, superseding any pending one.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

/// Cancellation handle for one scheduled call.
pub struct DebounceHandle {
    inner: AbortHandle,
}

impl DebounceHandle {
    /// Cancels the call if it has not started running yet.
    pub fn cancel(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedules `fut` to run after the quiet period. Any call still waiting
    /// out its quiet period is cancelled; only the latest call runs.
    pub fn call<F>(&self, fut: F) -> DebounceHandle
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        });
        let handle = task.abort_handle();

        let mut pending = self.pending.lock().unwrap();
        if let Some(prior) = pending.replace(handle.clone()) {
            prior.abort();
        }

        DebounceHandle { inner: handle }
    }

    /// Cancels whatever call is still pending, if any.
    pub fn cancel_pending(&self) {
        if let Some(prior) = self.pending.lock().unwrap().take() {
            prior.abort();
        }
    }
}
