//! Reconciliation job: periodic re-evaluation of every open project.
//!
//! One pass takes the run lease, loads the working set of non-terminal
//! projects as a snapshot, evaluates the rule table for each project at a
//! single `now`, and commits the resulting writes. Without a batch size the
//! whole pass is one unit of work; with one, each batch is its own unit of
//! work and the report records how many were committed before a failure.
//! A failed or interrupted pass is repaired by the next one, because
//! evaluation only depends on stored state and the current time.

use crate::config::LifecycleConfig;
use crate::project::{
    domain::{GracePeriod, ProjectChangeSet, ProjectSnapshot, SideEffect},
    ports::{ProjectRepository, ProjectRepositoryError, ReconciliationLock, ReconciliationLockError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Counters describing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Projects in the working set.
    pub loaded: usize,
    /// Projects evaluated so far.
    pub evaluated: usize,
    /// Projects whose status changed.
    pub transitions: usize,
    /// Projects whose freelancer assignment or applications changed.
    pub reassignments: usize,
    /// Record writes committed.
    pub writes: usize,
    /// Units of work committed.
    pub committed_batches: usize,
    /// Projects covered by committed units of work.
    pub committed_projects: usize,
}

/// Result of asking for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass ran to completion.
    Completed(ReconciliationReport),
    /// Another holder owns the run lease; nothing was done.
    Skipped,
}

/// Operational failures of a reconciliation pass.
///
/// Each variant that can occur after work started carries the report of the
/// batches committed before the failure.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The lock backend failed.
    #[error("reconciliation lock failed: {0}")]
    Lock(#[from] ReconciliationLockError),

    /// Shutdown was requested before the pass finished.
    #[error("reconciliation pass cancelled after {} committed batches", .report.committed_batches)]
    Cancelled {
        /// Progress at cancellation.
        report: ReconciliationReport,
    },

    /// A store or lock call exceeded the configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Configured bound.
        timeout: Duration,
        /// Progress at the timeout.
        report: ReconciliationReport,
    },

    /// Loading or committing failed.
    #[error("reconciliation {operation} failed: {source}")]
    Repository {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying failure.
        source: ProjectRepositoryError,
        /// Progress at the failure.
        report: ReconciliationReport,
    },
}

impl ReconciliationError {
    /// Returns the progress recorded before the failure, if any work started.
    #[must_use]
    pub const fn report(&self) -> Option<&ReconciliationReport> {
        match self {
            Self::Lock(_) => None,
            Self::Cancelled { report }
            | Self::Timeout { report, .. }
            | Self::Repository { report, .. } => Some(report),
        }
    }
}

/// Result type for reconciliation operations.
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

/// Periodic reconciliation of open projects against the clock.
pub struct ReconciliationJob<R, L, C>
where
    R: ProjectRepository,
    L: ReconciliationLock,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    lock: Arc<L>,
    clock: Arc<C>,
    config: LifecycleConfig,
    holder: String,
}

impl<R, L, C> ReconciliationJob<R, L, C>
where
    R: ProjectRepository,
    L: ReconciliationLock,
    C: Clock + Send + Sync,
{
    /// Creates a job with a unique lease holder name.
    #[must_use]
    pub fn new(repository: Arc<R>, lock: Arc<L>, clock: Arc<C>, config: LifecycleConfig) -> Self {
        Self {
            repository,
            lock,
            clock,
            config,
            holder: format!("reconciler-{}", Uuid::new_v4()),
        }
    }

    /// Overrides the lease holder name.
    #[must_use]
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    /// Returns the lease holder name.
    #[must_use]
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Runs passes every `run_interval` until `cancel` fires.
    ///
    /// Failures are logged; the next tick recomputes from stored state.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            holder = %self.holder,
            interval_secs = self.config.run_interval.as_secs(),
            grace_period_days = self.config.grace_period.days(),
            "Reconciliation job started"
        );

        let mut interval = tokio::time::interval(self.config.run_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(holder = %self.holder, "Reconciliation job stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.run_pass(&cancel).await {
                        Ok(PassOutcome::Completed(report)) => {
                            info!(
                                loaded = report.loaded,
                                transitions = report.transitions,
                                writes = report.writes,
                                batches = report.committed_batches,
                                "Reconciliation pass completed"
                            );
                        }
                        Ok(PassOutcome::Skipped) => {
                            info!(holder = %self.holder, "Reconciliation pass skipped, lease held elsewhere");
                        }
                        Err(err) => {
                            error!(error = %err, report = ?err.report(), "Reconciliation pass failed");
                        }
                    }
                }
            }
        }
    }

    /// Runs one pass under the run lease.
    ///
    /// # Errors
    ///
    /// Returns [`ReconciliationError`] when the lease cannot be checked, the
    /// working set cannot be loaded, a batch fails to commit, a call times
    /// out, or `cancel` fires before the pass finishes.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> ReconciliationResult<PassOutcome> {
        let acquired = self
            .bounded_lock(
                "acquire reconciliation lease",
                self.lock.try_acquire(&self.holder, self.config.lease_duration),
            )
            .await?;
        if !acquired {
            return Ok(PassOutcome::Skipped);
        }

        let outcome = self.reconcile(cancel).await;

        if let Err(err) = self
            .bounded_lock(
                "release reconciliation lease",
                self.lock.release(&self.holder),
            )
            .await
        {
            warn!(holder = %self.holder, error = %err, "Failed to release reconciliation lease; it will expire");
        }

        outcome.map(PassOutcome::Completed)
    }

    async fn reconcile(&self, cancel: &CancellationToken) -> ReconciliationResult<ReconciliationReport> {
        let mut report = ReconciliationReport::default();
        let now = self.clock.utc();

        let working_set = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ReconciliationError::Cancelled { report }),
            loaded = self.bounded_store("load", self.repository.find_open_snapshots(), report) => loaded?,
        };
        report.loaded = working_set.len();
        debug!(projects = report.loaded, %now, "Reconciliation working set loaded");

        let batch_size = self
            .config
            .batch_size
            .map_or(working_set.len().max(1), NonZeroUsize::get);

        for batch in working_set.chunks(batch_size) {
            if cancel.is_cancelled() {
                return Err(ReconciliationError::Cancelled { report });
            }

            let changes = evaluate_batch(batch, now, self.config.grace_period, &mut report);
            if changes.is_empty() {
                continue;
            }

            let committed = self
                .bounded_store("commit", self.repository.commit(&changes), report)
                .await;
            if let Err(err) = committed {
                error!(
                    error = %err,
                    batch_projects = batch.len(),
                    committed_batches = report.committed_batches,
                    "Reconciliation batch rolled back"
                );
                return Err(err);
            }
            report.writes += changes.write_count();
            report.committed_batches += 1;
            report.committed_projects += batch.len();
        }

        Ok(report)
    }

    async fn bounded_store<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = Result<T, ProjectRepositoryError>> + Send,
        report: ReconciliationReport,
    ) -> ReconciliationResult<T> {
        let timeout = self.config.io_timeout;
        tokio::time::timeout(timeout, future)
            .await
            .map_err(|_| ReconciliationError::Timeout {
                operation,
                timeout,
                report,
            })?
            .map_err(|source| ReconciliationError::Repository {
                operation,
                source,
                report,
            })
    }

    async fn bounded_lock<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = Result<T, ReconciliationLockError>> + Send,
    ) -> ReconciliationResult<T> {
        let timeout = self.config.io_timeout;
        tokio::time::timeout(timeout, future)
            .await
            .map_err(|_| ReconciliationError::Timeout {
                operation,
                timeout,
                report: ReconciliationReport::default(),
            })?
            .map_err(ReconciliationError::from)
    }
}

/// Evaluates every project of a batch and collects the writes.
fn evaluate_batch(
    batch: &[ProjectSnapshot],
    now: DateTime<Utc>,
    grace_period: GracePeriod,
    report: &mut ReconciliationReport,
) -> ProjectChangeSet {
    let mut changes = ProjectChangeSet::new();
    for before in batch {
        let mut after = before.clone();
        let decision = after.reconcile(now, grace_period);
        report.evaluated += 1;

        let previous_status = before.lifecycle().status();
        if decision.changes_status(previous_status) {
            report.transitions += 1;
            debug!(
                project_id = %before.id(),
                from = %previous_status,
                to = %decision.next_status,
                rule = decision.rule.unwrap_or("none"),
                "Project status transition"
            );
        }
        if decision.side_effect == SideEffect::ReassignFreelancerAndRejectOthers
            && (before.project() != after.project() || before.applications() != after.applications())
        {
            report.reassignments += 1;
        }

        changes.record(before, &after);
    }
    changes
}
