use async_trait::async_trait;

use crate::app_error::AppResult;

/// Per-key mutual exclusion for the read-decide-write sequence of reconciliation.
///
/// While a guard for a key is held, no other caller can acquire the same key. A
/// TTL-based backend can lose the key mid-operation, so callers must not rely on the
/// guard alone for exactly-once effects.
#[async_trait]
pub trait ReconcileLockPort: Send + Sync {
    /// Wait for the key to become free and take it.
    ///
    /// Returns `AppError::ReconcileBusy` when the key stays taken past the configured wait.
    async fn acquire(&self, key: &str) -> AppResult<ReconcileGuard>;
}

/// Backend-specific release of a held key.
#[async_trait]
pub trait LockRelease: Send {
    async fn release(self: Box<Self>);
}

/// Held lock. Release it explicitly; dropping it without release relies on the backend
/// (in-process guards free on drop, Redis entries expire by TTL).
#[must_use = "the lock is held until the guard is released"]
pub struct ReconcileGuard {
    inner: Box<dyn LockRelease>,
}

impl ReconcileGuard {
    pub fn new(inner: impl LockRelease + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub async fn release(self) {
        self.inner.release().await;
    }
}
