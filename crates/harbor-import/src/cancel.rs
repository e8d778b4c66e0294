//! Cancellation tokens for the write and analysis paths

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared-flag cancellation token.
///
/// Cloning yields a handle to the same flag. `cancel` is safe to call from
/// any thread and is idempotent; running tasks observe the flag at their
/// next yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Subsequent calls are no-ops.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True when `other` is a handle to the same underlying flag.
    ///
    /// Supersession decisions compare token identity, not value: a task's
    /// result is current only while its token is still the one registered on
    /// the session.
    pub fn same_token(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}
