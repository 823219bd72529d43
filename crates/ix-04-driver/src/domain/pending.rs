//! Pending view store: the bridge between `RequestDriverState`, which is
//! acknowledged at once, and the `WriteExternalState` callback that later
//! carries the answer.
//!
//! Flow:
//! 1. The client registers the query's request id and gets a `PendingView`
//! 2. The client sends `RequestDriverState`
//! 3. The server receiving the callback calls `resolve()`
//! 4. The caller awaits `PendingView::wait` until its deadline, or cancels

use super::errors::DriverError;
use dashmap::DashMap;
use shared_types::{SessionId, View};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A request waiting for its view
struct PendingEntry {
    sender: oneshot::Sender<View>,
    session_id: SessionId,
    created_at: Instant,
}

/// Statistics for the pending view store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Requests registered
    pub registered: AtomicU64,
    /// Requests answered
    pub resolved: AtomicU64,
    /// Requests that hit their deadline
    pub timed_out: AtomicU64,
    /// Requests cancelled by the caller
    pub cancelled: AtomicU64,
}

/// Request id -> waiting caller.
#[derive(Default)]
pub struct PendingViews {
    pending: DashMap<String, PendingEntry>,
    stats: PendingStats,
}

impl PendingViews {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `request_id` and get the handle the caller waits on.
    pub fn register(self: &Arc<Self>, request_id: &str, session_id: &SessionId) -> PendingView {
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            request_id.to_string(),
            PendingEntry {
                sender,
                session_id: session_id.clone(),
                created_at: Instant::now(),
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = request_id, session_id = %session_id, "[ix-04] Registered pending view");

        PendingView {
            request_id: request_id.to_string(),
            receiver,
            store: Arc::clone(self),
        }
    }

    /// Hand `view` to whoever waits on `request_id`. Returns false if
    /// nobody does (already answered, timed out or cancelled).
    pub fn resolve(&self, request_id: &str, view: View) -> bool {
        let Some((_, entry)) = self.pending.remove(request_id) else {
            debug!(request_id = request_id, "[ix-04] View for unknown or finished request");
            return false;
        };
        match entry.sender.send(view) {
            Ok(()) => {
                self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = request_id,
                    session_id = %entry.session_id,
                    response_time_ms = entry.created_at.elapsed().as_millis() as u64,
                    "[ix-04] Resolved pending view"
                );
                true
            }
            Err(_) => {
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Session a pending request was made for.
    pub fn session_of(&self, request_id: &str) -> Option<SessionId> {
        self.pending.get(request_id).map(|e| e.session_id.clone())
    }

    /// Drop `request_id`; its waiter sees `Cancelled`.
    pub fn cancel(&self, request_id: &str) -> bool {
        if self.pending.remove(request_id).is_some() {
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = request_id, "[ix-04] Cancelled pending view");
            true
        } else {
            false
        }
    }

    /// Remove requests older than `max_age`. Returns how many went.
    pub fn remove_expired(&self, max_age: Duration) -> usize {
        let mut removed = 0;
        self.pending.retain(|id, entry| {
            let elapsed = entry.created_at.elapsed();
            if elapsed > max_age {
                warn!(
                    request_id = %id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "[ix-04] Removing expired pending view"
                );
                removed += 1;
                false
            } else {
                true
            }
        });
        self.stats.timed_out.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Whether `request_id` is still waiting
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Number of waiting requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn timed_out(&self, request_id: &str) {
        if self.pending.remove(request_id).is_some() {
            self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Handle on one outstanding `RequestDriverState`.
pub struct PendingView {
    request_id: String,
    receiver: oneshot::Receiver<View>,
    store: Arc<PendingViews>,
}

impl PendingView {
    /// Request id the answer is correlated by
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Handle that cancels this request from another task.
    pub fn canceller(&self) -> PendingCancel {
        PendingCancel {
            request_id: self.request_id.clone(),
            store: Arc::clone(&self.store),
        }
    }

    /// Wait up to `deadline` for the view.
    pub async fn wait(mut self, deadline: Duration) -> Result<View, DriverError> {
        match tokio::time::timeout(deadline, &mut self.receiver).await {
            Ok(Ok(view)) => Ok(view),
            Ok(Err(_)) => Err(DriverError::Cancelled(format!(
                "request {} cancelled",
                self.request_id
            ))),
            Err(_) => {
                self.store.timed_out(&self.request_id);
                warn!(
                    request_id = %self.request_id,
                    deadline_ms = deadline.as_millis() as u64,
                    "[ix-04] No view before deadline"
                );
                Err(DriverError::Timeout(format!(
                    "no view for request {} within {}ms",
                    self.request_id,
                    deadline.as_millis()
                )))
            }
        }
    }

    /// Give up on the request. The remote may still process it.
    pub fn cancel(self) -> bool {
        self.store.cancel(&self.request_id)
    }
}

impl Drop for PendingView {
    fn drop(&mut self) {
        // Abandoned handles must not leave entries behind
        self.store.pending.remove(&self.request_id);
    }
}

/// Cancels a `PendingView` from another task.
#[derive(Clone)]
pub struct PendingCancel {
    request_id: String,
    store: Arc<PendingViews>,
}

impl PendingCancel {
    /// Cancel; the waiter sees `DriverError::Cancelled`.
    pub fn cancel(&self) -> bool {
        self.store.cancel(&self.request_id)
    }
}
