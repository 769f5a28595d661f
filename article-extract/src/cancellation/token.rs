//! Cancellation token for cooperative cancellation.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::warn;

/// A callback type for cancellation notifications.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

/// Identifies a registered callback so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// A token for cooperative cancellation.
///
/// Cancellation is idempotent - only the first cancellation reason is kept.
/// Tasks either poll [`is_cancelled`](Self::is_cancelled) or await
/// [`cancelled`](Self::cancelled) inside a `select!`.
#[derive(Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Callbacks to invoke on cancellation.
    callbacks: RwLock<Vec<(CallbackId, CancelCallback)>>,
    /// Source of callback ids.
    next_callback: AtomicU64,
    /// The parent registration to remove when this token is dropped.
    parent: Mutex<Option<(Weak<CancellationToken>, CallbackId)>>,
    /// Wakes tasks parked in `cancelled()`.
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is cancelled whenever `self` is, with the same reason.
    ///
    /// Cancelling the child leaves the parent untouched. Dropping the child removes
    /// its registration from the parent, so a long-lived parent can hand out any
    /// number of children.
    #[must_use]
    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        let child = Arc::new(Self::new());
        let weak_child = Arc::downgrade(&child);
        let weak_parent = Arc::downgrade(self);
        let id = self.on_cancel(move || {
            if let Some(child) = weak_child.upgrade() {
                let reason = weak_parent
                    .upgrade()
                    .and_then(|parent| parent.reason())
                    .unwrap_or_else(|| "parent cancelled".to_string());
                child.cancel(reason);
            }
        });
        *child.parent.lock() = Some((Arc::downgrade(self), id));
        child
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    /// Callbacks are invoked immediately. Panics in callbacks are logged and suppressed.
    pub fn cancel(&self, reason: impl Into<String>) {
        {
            // The reason is in place before the flag is visible.
            let mut slot = self.reason.write();
            if self
                .cancelled
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            *slot = Some(reason.into());
        }
        self.notify.notify_waiters();

        let callbacks = std::mem::take(&mut *self.callbacks.write());
        for (_, callback) in &callbacks {
            run_callback(callback.as_ref());
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately and the returned id
    /// refers to nothing.
    pub fn on_cancel<F>(&self, callback: F) -> CallbackId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_callback.fetch_add(1, Ordering::Relaxed));
        {
            // Checked under the lock so a concurrent cancel() cannot miss the push.
            let mut callbacks = self.callbacks.write();
            if !self.is_cancelled() {
                callbacks.push((id, Box::new(callback)));
                return id;
            }
        }
        run_callback(&callback);
        id
    }

    /// Removes a callback that has not run yet. Returns whether it was found.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != id);
        callbacks.len() != before
    }

    /// Number of callbacks waiting for cancellation.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a cancel in between still wakes us.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

fn run_callback(callback: &(dyn Fn() + Send + Sync)) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl Drop for CancellationToken {
    fn drop(&mut self) {
        if let Some((parent, id)) = self.parent.get_mut().take() {
            if let Some(parent) = parent.upgrade() {
                parent.remove_callback(id);
            }
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}
