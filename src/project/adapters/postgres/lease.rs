//! Lease table backing run-level mutual exclusion across processes.

use super::repository::ProjectPgPool;
use crate::project::ports::{ReconciliationLock, ReconciliationLockError, ReconciliationLockResult};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use std::time::Duration;

/// Lease name used by the project reconciliation job.
pub const RECONCILIATION_LEASE: &str = "project_reconciliation";

const ACQUIRE_SQL: &str = "\
INSERT INTO reconciliation_leases (name, holder, expires_at) \
VALUES ($1, $2, now() + $3::float8 * interval '1 millisecond') \
ON CONFLICT (name) DO UPDATE \
SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at \
WHERE reconciliation_leases.expires_at <= now() \
   OR reconciliation_leases.holder = EXCLUDED.holder";

const RELEASE_SQL: &str = "DELETE FROM reconciliation_leases WHERE name = $1 AND holder = $2";

/// Lease stored in the `reconciliation_leases` table.
///
/// Expiry is judged against the database clock so hosts with skewed clocks
/// agree on when a lease lapses.
#[derive(Debug, Clone)]
pub struct PostgresReconciliationLock {
    pool: ProjectPgPool,
    name: String,
}

impl PostgresReconciliationLock {
    /// Creates a lock over the [`RECONCILIATION_LEASE`] row.
    #[must_use]
    pub fn new(pool: ProjectPgPool) -> Self {
        Self::named(pool, RECONCILIATION_LEASE)
    }

    /// Creates a lock over an arbitrary lease row.
    #[must_use]
    pub fn named(pool: ProjectPgPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ReconciliationLockResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ReconciliationLockResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ReconciliationLockError::backend)?;
            f(&mut connection)
        })
        .await
        .map_err(ReconciliationLockError::backend)?
    }
}

#[async_trait]
impl ReconciliationLock for PostgresReconciliationLock {
    async fn try_acquire(&self, holder: &str, lease: Duration) -> ReconciliationLockResult<bool> {
        let millis = i64::try_from(lease.as_millis())
            .map_err(|_| ReconciliationLockError::InvalidLease(lease))?;
        let name = self.name.clone();
        let holder = holder.to_owned();
        self.run_blocking(move |connection| {
            let affected = diesel::sql_query(ACQUIRE_SQL)
                .bind::<Text, _>(name)
                .bind::<Text, _>(holder)
                .bind::<BigInt, _>(millis)
                .execute(connection)
                .map_err(ReconciliationLockError::backend)?;
            Ok(affected == 1)
        })
        .await
    }

    async fn release(&self, holder: &str) -> ReconciliationLockResult<()> {
        let name = self.name.clone();
        let holder = holder.to_owned();
        self.run_blocking(move |connection| {
            diesel::sql_query(RELEASE_SQL)
                .bind::<Text, _>(name)
                .bind::<Text, _>(holder)
                .execute(connection)
                .map_err(ReconciliationLockError::backend)?;
            Ok(())
        })
        .await
    }
}
