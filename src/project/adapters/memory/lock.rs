//! Process-local reconciliation lease.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::project::ports::{
    ReconciliationLock, ReconciliationLockError, ReconciliationLockResult,
};

/// Lease held in process memory.
///
/// Only suitable when a single process runs the reconciliation job; several
/// instances need the `PostgreSQL` lease.
pub struct InMemoryReconciliationLock<C: Clock + Send + Sync> {
    lease: Arc<Mutex<Option<Lease>>>,
    clock: Arc<C>,
}

#[derive(Debug, Clone)]
struct Lease {
    holder: String,
    expires_at: DateTime<Utc>,
}

impl<C: Clock + Send + Sync> InMemoryReconciliationLock<C> {
    /// Creates an unheld lease timed by `clock`.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            lease: Arc::new(Mutex::new(None)),
            clock,
        }
    }

    /// Returns the current holder, ignoring expiry.
    #[must_use]
    pub fn holder(&self) -> Option<String> {
        self.lease
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|lease| lease.holder.clone())
    }
}

impl<C: Clock + Send + Sync> Clone for InMemoryReconciliationLock<C> {
    fn clone(&self) -> Self {
        Self {
            lease: Arc::clone(&self.lease),
            clock: Arc::clone(&self.clock),
        }
    }
}

#[async_trait]
impl<C: Clock + Send + Sync> ReconciliationLock for InMemoryReconciliationLock<C> {
    async fn try_acquire(&self, holder: &str, lease: Duration) -> ReconciliationLockResult<bool> {
        let duration =
            TimeDelta::from_std(lease).map_err(|_| ReconciliationLockError::InvalidLease(lease))?;
        let now = self.clock.utc();
        let expires_at = now
            .checked_add_signed(duration)
            .ok_or(ReconciliationLockError::InvalidLease(lease))?;

        let mut current = self
            .lease
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let available = current
            .as_ref()
            .is_none_or(|held| held.holder == holder || held.expires_at <= now);
        if available {
            *current = Some(Lease {
                holder: holder.to_owned(),
                expires_at,
            });
        }
        Ok(available)
    }

    async fn release(&self, holder: &str) -> ReconciliationLockResult<()> {
        let mut current = self
            .lease
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if current.as_ref().is_some_and(|held| held.holder == holder) {
            *current = None;
        }
        Ok(())
    }
}
