//! Shared test helpers for in-memory integration tests.

use chrono::{DateTime, Utc};
use hireloop::config::LifecycleConfig;
use hireloop::project::{
    adapters::memory::{
        InMemoryProjectRepository, InMemoryReconciliationLock, RecordingPaymentEmitter,
    },
    domain::{ProjectId, ProjectSnapshot, ProjectStatus, UserId},
    ports::ProjectRepository,
    services::{
        CreateProjectRequest, PassOutcome, ProjectWorkflowService, ReconciliationJob,
        ReconciliationReport,
    },
};
use rstest::fixture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use crate::test_helpers::{ManualClock, day, origin};

/// Workflow service wired to the in-memory adapters.
pub type MarketplaceService =
    ProjectWorkflowService<InMemoryProjectRepository, RecordingPaymentEmitter, ManualClock>;

/// Reconciliation job wired to the in-memory adapters.
pub type MarketplaceJob =
    ReconciliationJob<InMemoryProjectRepository, InMemoryReconciliationLock<ManualClock>, ManualClock>;

/// Every component of the engine sharing one store and one clock.
pub struct Marketplace {
    /// Shared project store.
    pub repository: Arc<InMemoryProjectRepository>,
    /// Recorded payment notices.
    pub payments: Arc<RecordingPaymentEmitter>,
    /// Test clock.
    pub clock: Arc<ManualClock>,
    /// Workflow service.
    pub service: MarketplaceService,
    /// Reconciliation job.
    pub job: MarketplaceJob,
}

impl Marketplace {
    /// Wires the engine with default configuration at [`origin`].
    #[must_use]
    pub fn new() -> Self {
        let config = LifecycleConfig::default();
        let repository = Arc::new(InMemoryProjectRepository::new());
        let payments = Arc::new(RecordingPaymentEmitter::new());
        let clock = Arc::new(ManualClock::at(origin()));
        let lock = Arc::new(InMemoryReconciliationLock::new(Arc::clone(&clock)));
        let service = ProjectWorkflowService::new(
            Arc::clone(&repository),
            Arc::clone(&payments),
            Arc::clone(&clock),
            &config,
        );
        let job = ReconciliationJob::new(Arc::clone(&repository), lock, Arc::clone(&clock), config);
        Self {
            repository,
            payments,
            clock,
            service,
            job,
        }
    }

    /// Posts a project whose applications open on day 1 and close on day 10,
    /// with work running from day 12 to day 30.
    ///
    /// # Errors
    ///
    /// Returns an error if project creation fails.
    pub async fn post_project(&self, employer: UserId) -> eyre::Result<ProjectSnapshot> {
        let request = CreateProjectRequest::new(
            employer,
            "Redesign the checkout",
            "1500",
            day(1),
            day(10),
            day(12),
            day(30),
        );
        Ok(self.service.create_project(request).await?)
    }

    /// Moves the clock to `at` and runs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails or is skipped.
    pub async fn reconcile_at(&self, at: DateTime<Utc>) -> eyre::Result<ReconciliationReport> {
        self.clock.set(at);
        match self.job.run_pass(&CancellationToken::new()).await? {
            PassOutcome::Completed(report) => Ok(report),
            PassOutcome::Skipped => Err(eyre::eyre!("reconciliation pass was skipped")),
        }
    }

    /// Returns the stored status of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the lifecycle cannot be loaded.
    pub async fn status(&self, project_id: ProjectId) -> eyre::Result<ProjectStatus> {
        self.repository
            .find_lifecycle(project_id)
            .await?
            .map(|lifecycle| lifecycle.status())
            .ok_or_else(|| eyre::eyre!("missing lifecycle for {project_id}"))
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}

/// Provides a freshly wired marketplace for each test.
#[fixture]
pub fn marketplace() -> Marketplace {
    Marketplace::new()
}
