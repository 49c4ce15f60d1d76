//! Run-level mutual exclusion for the reconciliation job.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for reconciliation lock operations.
pub type ReconciliationLockResult<T> = Result<T, ReconciliationLockError>;

/// A lease shared by every process that may run the reconciliation job.
///
/// A lease expires after its duration so a crashed holder cannot block later
/// passes forever. Implementations must be safe across processes, not only
/// across tasks.
#[async_trait]
pub trait ReconciliationLock: Send + Sync {
    /// Tries to take the lease for `holder` for `lease` from now.
    ///
    /// Returns `true` when the lease is held by `holder` after the call, which
    /// includes renewing a lease `holder` already owns.
    async fn try_acquire(&self, holder: &str, lease: Duration) -> ReconciliationLockResult<bool>;

    /// Releases the lease if `holder` owns it.
    async fn release(&self, holder: &str) -> ReconciliationLockResult<()>;
}

/// Errors returned by reconciliation lock adapters.
#[derive(Debug, Clone, Error)]
pub enum ReconciliationLockError {
    /// The lease duration cannot be represented.
    #[error("lease duration {0:?} is out of range")]
    InvalidLease(Duration),

    /// Backend failure.
    #[error("lock backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReconciliationLockError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
