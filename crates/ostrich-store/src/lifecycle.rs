use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::{debug, warn};

use crate::error::{Access, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    in_flight: usize,
    closing: bool,
    closed: bool,
    /// Close calls that have not returned yet.
    closers: usize,
    /// Number of shutdown attempts that have completed.
    attempts: u64,
}

/// Tracks in-flight operations on a store and drains them before shutdown.
///
/// Operations register through [`Lifecycle::begin`] and deregister when the
/// returned guard drops, on success and failure alike. [`Lifecycle::close`]
/// stops admitting operations, waits for the counter to reach zero and then
/// runs the shutdown exactly once for every group of concurrent callers.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<State>,
    drained: Notify,
    /// Serializes shutdown attempts and records the last outcome with the
    /// attempt number it belongs to.
    shutdown: AsyncMutex<Option<(u64, StoreResult<()>)>>,
}

/// Registration of one admitted operation.
#[must_use = "the operation is deregistered when the guard drops"]
pub struct OperationGuard<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.lifecycle.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.lifecycle.drained.notify_waiters();
        }
    }
}

/// Registration of one pending close. If the last pending close is dropped
/// before an attempt completes, the store admits operations again.
struct PendingClose<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for PendingClose<'_> {
    fn drop(&mut self) {
        let mut state = self.lifecycle.lock();
        state.closers -= 1;
        if state.closers == 0 && !state.closed {
            state.closing = false;
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("lifecycle lock poisoned")
    }

    /// Admit one operation, or reject it once a close has been requested.
    pub fn begin(&self, access: Access) -> StoreResult<OperationGuard<'_>> {
        let mut state = self.lock();
        if state.closed || state.closing {
            return Err(StoreError::Closed(access));
        }
        state.in_flight += 1;
        Ok(OperationGuard { lifecycle: self })
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// `true` while a close is pending or once it has completed.
    pub fn is_closing(&self) -> bool {
        let state = self.lock();
        state.closing || state.closed
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Drain admitted operations, then run `shutdown`.
    ///
    /// Callers that arrive while an attempt is pending receive that
    /// attempt's outcome. On failure the store is reopened for operations
    /// and a later call starts a new attempt. Closing a closed store
    /// resolves immediately without running `shutdown`. Dropping the future
    /// while it waits withdraws the request.
    pub async fn close<F, Fut>(&self, shutdown: F) -> StoreResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<()>>,
    {
        let seen = {
            let mut state = self.lock();
            if state.closed {
                return Ok(());
            }
            state.closing = true;
            state.closers += 1;
            state.attempts
        };
        let _pending = PendingClose { lifecycle: self };

        let mut outcome = self.shutdown.lock().await;
        if let Some((attempt, result)) = outcome.as_ref() {
            if *attempt > seen {
                return result.clone();
            }
        }

        let pending = self.in_flight();
        if pending > 0 {
            debug!(pending, "waiting for in-flight operations before close");
        }
        self.wait_drained().await;
        let result = shutdown().await;

        let attempt = {
            let mut state = self.lock();
            state.attempts += 1;
            match &result {
                Ok(()) => state.closed = true,
                Err(error) => {
                    warn!(%error, "store shutdown failed, store stays open");
                    state.closing = false;
                }
            }
            state.attempts
        };
        *outcome = Some((attempt, result.clone()));
        result
    }
}
