//! Service layer for the application and acceptance workflow.
//!
//! Every operation re-reads the project inside its own unit of work, checks
//! its business preconditions against that fresh read, and commits a change
//! set guarded by the revisions it read. A concurrent writer (another request
//! or the reconciliation pass) therefore surfaces as
//! [`ProjectWorkflowError::Conflict`] instead of a lost update.

use crate::config::LifecycleConfig;
use crate::project::{
    domain::{
        Application, ApplicationId, Budget, CategoryId, Lifecycle, PaymentReference,
        PreconditionViolation, Project, ProjectChangeSet, ProjectDetails, ProjectDomainError,
        ProjectId, ProjectSnapshot, Schedule, UserId,
    },
    ports::{
        PaymentCancellationEmitter, PaymentEmitterError, ProjectRepository,
        ProjectRepositoryError, RecordKey,
    },
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Request payload for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectRequest {
    employer_id: UserId,
    title: String,
    description: String,
    budget: String,
    category_id: Option<CategoryId>,
    applications_start: DateTime<Utc>,
    applications_deadline: DateTime<Utc>,
    work_start: DateTime<Utc>,
    work_deadline: DateTime<Utc>,
}

impl CreateProjectRequest {
    /// Creates a request with the required project fields.
    ///
    /// `budget` is a decimal amount such as `"1250.50"`. It and the four
    /// boundaries are validated when the project is created.
    #[must_use]
    pub fn new(
        employer_id: UserId,
        title: impl Into<String>,
        budget: impl Into<String>,
        applications_start: DateTime<Utc>,
        applications_deadline: DateTime<Utc>,
        work_start: DateTime<Utc>,
        work_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            employer_id,
            title: title.into(),
            description: String::new(),
            budget: budget.into(),
            category_id: None,
            applications_start,
            applications_deadline,
            work_start,
            work_deadline,
        }
    }

    /// Sets the project description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the project category.
    #[must_use]
    pub const fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Employer's answer to an acceptance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceDecision {
    /// The delivered work is accepted; the project completes.
    Confirm,
    /// The delivered work is turned down.
    Reject,
}

/// Read-only project view consumed by the payments subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaymentView {
    /// Project identifier.
    pub id: ProjectId,
    /// Budget in minor currency units.
    pub budget_minor_units: i64,
    /// Assigned freelancer identifier, empty when none.
    pub assigned_freelancer_id: String,
    /// Payment reference, empty when none.
    pub payment_reference: String,
}

impl From<&Project> for ProjectPaymentView {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id(),
            budget_minor_units: project.details().budget().minor_units(),
            assigned_freelancer_id: project
                .assigned_freelancer_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            payment_reference: project
                .payment_reference()
                .map(|reference| reference.as_str().to_owned())
                .unwrap_or_default(),
        }
    }
}

/// Errors surfaced to workflow callers.
#[derive(Debug, Error)]
pub enum ProjectWorkflowError {
    /// A referenced project, lifecycle or application does not exist.
    #[error("{0} not found")]
    NotFound(RecordKey),

    /// The actor is not the owning employer or the assigned freelancer.
    #[error("user {actor} may not {operation} on project {project_id}")]
    Forbidden {
        /// Acting user.
        actor: UserId,
        /// Target project.
        project_id: ProjectId,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A status or flag precondition does not hold.
    #[error("bad request: {0}")]
    BadRequest(PreconditionViolation),

    /// The freelancer already applied to the project.
    #[error("freelancer {freelancer_id} already applied to project {project_id}")]
    AlreadyExists {
        /// Target project.
        project_id: ProjectId,
        /// Applying freelancer.
        freelancer_id: UserId,
    },

    /// The project changed between read and commit.
    #[error("{0} was modified concurrently, retry the request")]
    Conflict(RecordKey),

    /// A store or emitter call exceeded the configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Configured bound.
        timeout: Duration,
    },

    /// Domain validation failed.
    #[error(transparent)]
    Domain(ProjectDomainError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(ProjectRepositoryError),

    /// The payment cancellation notice could not be published.
    #[error(transparent)]
    Payments(#[from] PaymentEmitterError),
}

impl From<ProjectDomainError> for ProjectWorkflowError {
    fn from(err: ProjectDomainError) -> Self {
        match err {
            ProjectDomainError::Precondition(violation) => Self::BadRequest(violation),
            ProjectDomainError::UnknownApplication(id) => {
                Self::NotFound(RecordKey::Application(id))
            }
            ProjectDomainError::DuplicateApplication {
                project_id,
                freelancer_id,
            } => Self::AlreadyExists {
                project_id,
                freelancer_id,
            },
            other => Self::Domain(other),
        }
    }
}

impl From<ProjectRepositoryError> for ProjectWorkflowError {
    fn from(err: ProjectRepositoryError) -> Self {
        match err {
            ProjectRepositoryError::NotFound(key) => Self::NotFound(key),
            ProjectRepositoryError::Conflict(key) => Self::Conflict(key),
            ProjectRepositoryError::DuplicateApplication {
                project_id,
                freelancer_id,
            } => Self::AlreadyExists {
                project_id,
                freelancer_id,
            },
            other => Self::Repository(other),
        }
    }
}

/// Result type for workflow service operations.
pub type ProjectWorkflowResult<T> = Result<T, ProjectWorkflowError>;

/// Application and acceptance workflow service.
#[derive(Clone)]
pub struct ProjectWorkflowService<R, P, C>
where
    R: ProjectRepository,
    P: PaymentCancellationEmitter,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    payments: Arc<P>,
    clock: Arc<C>,
    io_timeout: Duration,
}

impl<R, P, C> ProjectWorkflowService<R, P, C>
where
    R: ProjectRepository,
    P: PaymentCancellationEmitter,
    C: Clock + Send + Sync,
{
    /// Creates a new workflow service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        payments: Arc<P>,
        clock: Arc<C>,
        config: &LifecycleConfig,
    ) -> Self {
        Self {
            repository,
            payments,
            clock,
            io_timeout: config.io_timeout,
        }
    }

    /// Creates a project with its lifecycle in `Published`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Domain`] when the title, budget or
    /// schedule is invalid, or repository errors when persistence fails.
    pub async fn create_project(
        &self,
        request: CreateProjectRequest,
    ) -> ProjectWorkflowResult<ProjectSnapshot> {
        let schedule = Schedule::new(
            request.applications_start,
            request.applications_deadline,
            request.work_start,
            request.work_deadline,
        )?;
        let budget = Budget::parse(&request.budget)?;
        let mut details = ProjectDetails::new(request.title, request.description, budget)?;
        if let Some(category_id) = request.category_id {
            details = details.with_category(category_id);
        }

        let now = self.clock.utc();
        let project = Project::new(request.employer_id, details, now);
        let lifecycle = Lifecycle::new(project.id(), schedule, now);
        let snapshot = ProjectSnapshot::new(project, lifecycle, Vec::new());

        self.bounded("create project", self.repository.create(&snapshot))
            .await?;
        info!(
            project_id = %snapshot.id(),
            employer_id = %request.employer_id,
            %budget,
            "project created"
        );
        Ok(snapshot)
    }

    /// Submits a pending application from `freelancer_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::AlreadyExists`] when the freelancer
    /// already applied, or [`ProjectWorkflowError::NotFound`] when the project
    /// does not exist.
    pub async fn apply(
        &self,
        project_id: ProjectId,
        freelancer_id: UserId,
    ) -> ProjectWorkflowResult<Application> {
        let now = self.clock.utc();
        let (application_id, snapshot) = self
            .mutate(project_id, "apply", |snapshot| {
                Ok(snapshot.add_application(freelancer_id, now)?)
            })
            .await?;
        snapshot
            .application(application_id)
            .cloned()
            .ok_or(ProjectWorkflowError::NotFound(RecordKey::Application(
                application_id,
            )))
    }

    /// Deletes a pending application owned by `freelancer_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Forbidden`] when the application
    /// belongs to another freelancer, or [`ProjectWorkflowError::BadRequest`]
    /// when it is no longer pending.
    pub async fn withdraw_application(
        &self,
        project_id: ProjectId,
        application_id: ApplicationId,
        freelancer_id: UserId,
    ) -> ProjectWorkflowResult<()> {
        self.mutate(project_id, "withdraw application", |snapshot| {
            let owner = snapshot
                .application(application_id)
                .map(Application::freelancer_id)
                .ok_or(ProjectWorkflowError::NotFound(RecordKey::Application(
                    application_id,
                )))?;
            if owner != freelancer_id {
                return Err(forbidden(freelancer_id, project_id, "withdraw application"));
            }
            Ok(snapshot.withdraw_application(application_id)?)
        })
        .await?;
        Ok(())
    }

    /// Accepts an application on behalf of the owning employer.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Forbidden`] for non-owners and
    /// [`ProjectWorkflowError::BadRequest`] unless the project is accepting
    /// applications, has no assigned freelancer, and no other application is
    /// accepted.
    pub async fn accept_application(
        &self,
        project_id: ProjectId,
        application_id: ApplicationId,
        employer_id: UserId,
    ) -> ProjectWorkflowResult<Application> {
        let (_, snapshot) = self
            .mutate(project_id, "accept application", |snapshot| {
                ensure_owner(snapshot, employer_id, "accept application")?;
                ensure_application(snapshot, application_id)?;
                Ok(snapshot.accept_application(application_id)?)
            })
            .await?;
        info!(%project_id, %application_id, "application accepted");
        applied_application(&snapshot, application_id)
    }

    /// Reverts an accepted application to pending.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Forbidden`] for non-owners and
    /// [`ProjectWorkflowError::BadRequest`] unless the project is accepting
    /// applications and the application is accepted.
    pub async fn reject_application(
        &self,
        project_id: ProjectId,
        application_id: ApplicationId,
        employer_id: UserId,
    ) -> ProjectWorkflowResult<Application> {
        let (_, snapshot) = self
            .mutate(project_id, "reject application", |snapshot| {
                ensure_owner(snapshot, employer_id, "reject application")?;
                ensure_application(snapshot, application_id)?;
                Ok(snapshot.reject_application(application_id)?)
            })
            .await?;
        info!(%project_id, %application_id, "application acceptance reverted");
        applied_application(&snapshot, application_id)
    }

    /// Records the assigned freelancer's request for acceptance.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Forbidden`] unless `freelancer_id` is
    /// the assigned freelancer, and [`ProjectWorkflowError::BadRequest`]
    /// unless the project is in progress or expired.
    pub async fn request_acceptance(
        &self,
        project_id: ProjectId,
        freelancer_id: UserId,
    ) -> ProjectWorkflowResult<Lifecycle> {
        let now = self.clock.utc();
        let (_, snapshot) = self
            .mutate(project_id, "request acceptance", |snapshot| {
                if snapshot.project().assigned_freelancer_id() != Some(freelancer_id) {
                    return Err(forbidden(freelancer_id, project_id, "request acceptance"));
                }
                Ok(snapshot.request_acceptance(now)?)
            })
            .await?;
        info!(%project_id, "acceptance requested");
        Ok(snapshot.lifecycle().clone())
    }

    /// Confirms or rejects a pending acceptance request.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Forbidden`] for non-owners and
    /// [`ProjectWorkflowError::BadRequest`] unless acceptance was requested
    /// and the project is pending review.
    pub async fn resolve_acceptance(
        &self,
        project_id: ProjectId,
        employer_id: UserId,
        decision: AcceptanceDecision,
    ) -> ProjectWorkflowResult<Lifecycle> {
        let now = self.clock.utc();
        let confirm = decision == AcceptanceDecision::Confirm;
        let (_, snapshot) = self
            .mutate(project_id, "resolve acceptance", |snapshot| {
                ensure_owner(snapshot, employer_id, "resolve acceptance")?;
                Ok(snapshot.resolve_acceptance(confirm, now)?)
            })
            .await?;
        info!(%project_id, ?decision, "acceptance resolved");
        Ok(snapshot.lifecycle().clone())
    }

    /// Cancels a project on behalf of its owner.
    ///
    /// The status becomes `Cancelled` whatever it was. When the project carries
    /// a payment reference, exactly one cancellation notice is emitted after
    /// the status change is committed.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::Forbidden`] for non-owners, or
    /// [`ProjectWorkflowError::Payments`] when the committed cancellation's
    /// notice could not be published.
    pub async fn cancel_project(
        &self,
        project_id: ProjectId,
        employer_id: UserId,
    ) -> ProjectWorkflowResult<Lifecycle> {
        let now = self.clock.utc();
        let (_, snapshot) = self
            .mutate(project_id, "cancel project", |snapshot| {
                ensure_owner(snapshot, employer_id, "cancel project")?;
                snapshot.cancel(now);
                Ok(())
            })
            .await?;
        info!(%project_id, "project cancelled by owner");

        if let Some(reference) = snapshot.project().payment_reference() {
            self.bounded("emit payment cancellation", self.payments.cancel(reference))
                .await?;
            info!(%project_id, payment_reference = %reference, "payment cancellation emitted");
        }
        Ok(snapshot.lifecycle().clone())
    }

    /// Looks up the payment-facing view of a project.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::NotFound`] when the project does not
    /// exist.
    pub async fn find_payment_view(
        &self,
        project_id: ProjectId,
    ) -> ProjectWorkflowResult<ProjectPaymentView> {
        let project = self
            .bounded("find project", self.repository.find_project(project_id))
            .await?
            .ok_or(ProjectWorkflowError::NotFound(RecordKey::Project(project_id)))?;
        Ok(ProjectPaymentView::from(&project))
    }

    /// Records the payment reference sent by the payments flow.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::NotFound`] when the project does not
    /// exist, or [`ProjectWorkflowError::Domain`] when the reference is empty.
    pub async fn record_payment_reference(
        &self,
        project_id: ProjectId,
        reference: impl Into<String>,
    ) -> ProjectWorkflowResult<()> {
        let payment_reference = PaymentReference::new(reference)?;
        self.mutate(project_id, "record payment reference", |snapshot| {
            snapshot.record_payment_reference(payment_reference);
            Ok(())
        })
        .await?;
        debug!(%project_id, "payment reference recorded");
        Ok(())
    }

    /// Returns the applications of a project in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectWorkflowError::NotFound`] when the project does not
    /// exist.
    pub async fn list_applications(
        &self,
        project_id: ProjectId,
    ) -> ProjectWorkflowResult<Vec<Application>> {
        self.bounded("find project", self.repository.find_project(project_id))
            .await?
            .ok_or(ProjectWorkflowError::NotFound(RecordKey::Project(project_id)))?;
        self.bounded(
            "find applications",
            self.repository.find_applications_by_project(project_id),
        )
        .await
    }

    /// Finds the application `freelancer_id` submitted to a project.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the lookup fails.
    pub async fn find_application(
        &self,
        project_id: ProjectId,
        freelancer_id: UserId,
    ) -> ProjectWorkflowResult<Option<Application>> {
        self.bounded(
            "find application",
            self.repository
                .find_application_by_freelancer(project_id, freelancer_id),
        )
        .await
    }

    /// Reads a project, applies `operation` to a copy, and commits the
    /// difference guarded by the revisions read.
    async fn mutate<T>(
        &self,
        project_id: ProjectId,
        name: &'static str,
        operation: impl FnOnce(&mut ProjectSnapshot) -> ProjectWorkflowResult<T> + Send,
    ) -> ProjectWorkflowResult<(T, ProjectSnapshot)> {
        let before = self
            .bounded(name, self.repository.find_snapshot(project_id))
            .await?
            .ok_or(ProjectWorkflowError::NotFound(RecordKey::Project(project_id)))?;
        let mut after = before.clone();
        let value = operation(&mut after)?;

        let changes = ProjectChangeSet::between(&before, &after);
        self.bounded(name, self.repository.commit(&changes)).await?;
        debug!(%project_id, operation = name, writes = changes.write_count(), "workflow change committed");
        Ok((value, after))
    }

    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        future: impl Future<Output = Result<T, E>> + Send,
    ) -> ProjectWorkflowResult<T>
    where
        ProjectWorkflowError: From<E>,
    {
        tokio::time::timeout(self.io_timeout, future)
            .await
            .map_err(|_| ProjectWorkflowError::Timeout {
                operation,
                timeout: self.io_timeout,
            })?
            .map_err(ProjectWorkflowError::from)
    }
}

fn forbidden(actor: UserId, project_id: ProjectId, operation: &'static str) -> ProjectWorkflowError {
    ProjectWorkflowError::Forbidden {
        actor,
        project_id,
        operation,
    }
}

fn ensure_owner(
    snapshot: &ProjectSnapshot,
    employer_id: UserId,
    operation: &'static str,
) -> ProjectWorkflowResult<()> {
    if snapshot.project().is_owned_by(employer_id) {
        Ok(())
    } else {
        Err(forbidden(employer_id, snapshot.id(), operation))
    }
}

fn ensure_application(
    snapshot: &ProjectSnapshot,
    application_id: ApplicationId,
) -> ProjectWorkflowResult<()> {
    snapshot
        .application(application_id)
        .map(|_| ())
        .ok_or(ProjectWorkflowError::NotFound(RecordKey::Application(
            application_id,
        )))
}

fn applied_application(
    snapshot: &ProjectSnapshot,
    application_id: ApplicationId,
) -> ProjectWorkflowResult<Application> {
    snapshot
        .application(application_id)
        .cloned()
        .ok_or(ProjectWorkflowError::NotFound(RecordKey::Application(
            application_id,
        )))
}
