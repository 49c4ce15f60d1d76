//! Project lifecycle: the temporal status record owned by each project.

use super::{ParseProjectStatusError, PreconditionViolation, ProjectDomainError, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project lifecycle status.
///
/// Variants are declared in the order the lifecycle generally progresses;
/// `Expired` and `Cancelled` are exceptional branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Project is visible but not yet accepting applications.
    Published,
    /// Freelancers may apply and the employer may accept an application.
    AcceptingApplications,
    /// Application window closed; waiting for the work window to open.
    WaitingForWorkStart,
    /// An assigned freelancer is working on the project.
    InProgress,
    /// The freelancer asked the employer to accept the delivered work.
    PendingForReview,
    /// The employer confirmed the work.
    Completed,
    /// The work deadline passed without an accepted delivery.
    Expired,
    /// The project was cancelled by its owner or by the reconciliation pass.
    Cancelled,
}

impl ProjectStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Published,
        Self::AcceptingApplications,
        Self::WaitingForWorkStart,
        Self::InProgress,
        Self::PendingForReview,
        Self::Completed,
        Self::Expired,
        Self::Cancelled,
    ];

    /// Statuses no automatic transition ever leaves.
    pub const TERMINAL: [Self; 2] = [Self::Completed, Self::Cancelled];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::AcceptingApplications => "accepting_applications",
            Self::WaitingForWorkStart => "waiting_for_work_start",
            Self::InProgress => "in_progress",
            Self::PendingForReview => "pending_for_review",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for `Completed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = ParseProjectStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseProjectStatusError(value.to_owned()))
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four scheduling boundaries of a project.
///
/// Ordering is validated once at construction and never re-validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    applications_start: DateTime<Utc>,
    applications_deadline: DateTime<Utc>,
    work_start: DateTime<Utc>,
    work_deadline: DateTime<Utc>,
}

impl Schedule {
    /// Creates a schedule, checking that the boundaries are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::InvalidSchedule`] naming the first pair of
    /// boundaries found out of order.
    pub fn new(
        applications_start: DateTime<Utc>,
        applications_deadline: DateTime<Utc>,
        work_start: DateTime<Utc>,
        work_deadline: DateTime<Utc>,
    ) -> Result<Self, ProjectDomainError> {
        let boundaries = [
            ("applications_start", applications_start),
            ("applications_deadline", applications_deadline),
            ("work_start", work_start),
            ("work_deadline", work_deadline),
        ];
        for pair in boundaries.windows(2) {
            if let [(earlier_name, earlier), (later_name, later)] = *pair
                && earlier > later
            {
                return Err(ProjectDomainError::InvalidSchedule {
                    earlier_name,
                    earlier,
                    later_name,
                    later,
                });
            }
        }

        Ok(Self::from_persisted(
            applications_start,
            applications_deadline,
            work_start,
            work_deadline,
        ))
    }

    /// Rebuilds a schedule from storage without re-validating its ordering.
    #[must_use]
    pub const fn from_persisted(
        applications_start: DateTime<Utc>,
        applications_deadline: DateTime<Utc>,
        work_start: DateTime<Utc>,
        work_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            applications_start,
            applications_deadline,
            work_start,
            work_deadline,
        }
    }

    /// Returns when freelancers may start applying.
    #[must_use]
    pub const fn applications_start(&self) -> DateTime<Utc> {
        self.applications_start
    }

    /// Returns when the application window closes.
    #[must_use]
    pub const fn applications_deadline(&self) -> DateTime<Utc> {
        self.applications_deadline
    }

    /// Returns when work starts.
    #[must_use]
    pub const fn work_start(&self) -> DateTime<Utc> {
        self.work_start
    }

    /// Returns when work must be delivered.
    #[must_use]
    pub const fn work_deadline(&self) -> DateTime<Utc> {
        self.work_deadline
    }
}

/// Lifecycle record owned one-to-one by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    project_id: ProjectId,
    schedule: Schedule,
    status: ProjectStatus,
    acceptance_requested: bool,
    acceptance_confirmed: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    revision: u64,
}

/// Parameter object for reconstructing a persisted lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLifecycleData {
    /// Owning project.
    pub project_id: ProjectId,
    /// Scheduling boundaries.
    pub schedule: Schedule,
    /// Persisted status.
    pub status: ProjectStatus,
    /// Whether the freelancer requested acceptance.
    pub acceptance_requested: bool,
    /// Whether the employer confirmed acceptance.
    pub acceptance_confirmed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the latest transition, if any.
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency revision.
    pub revision: u64,
}

impl Lifecycle {
    /// Creates the lifecycle of a freshly created project in `Published`.
    #[must_use]
    pub const fn new(project_id: ProjectId, schedule: Schedule, created_at: DateTime<Utc>) -> Self {
        Self {
            project_id,
            schedule,
            status: ProjectStatus::Published,
            acceptance_requested: false,
            acceptance_confirmed: false,
            created_at,
            updated_at: None,
            revision: 0,
        }
    }

    /// Reconstructs a lifecycle from persisted storage.
    #[must_use]
    pub const fn from_persisted(data: PersistedLifecycleData) -> Self {
        Self {
            project_id: data.project_id,
            schedule: data.schedule,
            status: data.status,
            acceptance_requested: data.acceptance_requested,
            acceptance_confirmed: data.acceptance_confirmed,
            created_at: data.created_at,
            updated_at: data.updated_at,
            revision: data.revision,
        }
    }

    /// Returns the owning project identifier.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the scheduling boundaries.
    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> ProjectStatus {
        self.status
    }

    /// Returns whether the freelancer requested acceptance.
    #[must_use]
    pub const fn acceptance_requested(&self) -> bool {
        self.acceptance_requested
    }

    /// Returns whether the employer confirmed acceptance.
    #[must_use]
    pub const fn acceptance_confirmed(&self) -> bool {
        self.acceptance_confirmed
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the timestamp of the latest transition, if any.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns the revision this value was read at.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Moves to `status`, stamping `updated_at` when the status changes.
    ///
    /// Returns `true` when the status changed.
    pub fn transition_to(&mut self, status: ProjectStatus, at: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = Some(at);
        true
    }

    /// Records the assigned freelancer's request for acceptance.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionViolation::StatusNotAllowed`] unless the status is
    /// `InProgress` or `Expired`.
    pub fn request_acceptance(&mut self, at: DateTime<Utc>) -> Result<(), ProjectDomainError> {
        self.ensure_status(
            "request acceptance",
            &[ProjectStatus::InProgress, ProjectStatus::Expired],
        )?;
        self.acceptance_requested = true;
        self.transition_to(ProjectStatus::PendingForReview, at);
        Ok(())
    }

    /// Resolves a pending acceptance request.
    ///
    /// Confirming completes the project. Rejecting clears both flags and leaves
    /// the status at `PendingForReview`.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionViolation::AcceptanceNotRequested`] when no request
    /// is pending, or [`PreconditionViolation::StatusNotAllowed`] when the
    /// status is not `PendingForReview`.
    pub fn resolve_acceptance(
        &mut self,
        confirm: bool,
        at: DateTime<Utc>,
    ) -> Result<(), ProjectDomainError> {
        if !self.acceptance_requested {
            return Err(PreconditionViolation::AcceptanceNotRequested(self.project_id).into());
        }
        self.ensure_status("resolve acceptance", &[ProjectStatus::PendingForReview])?;

        if confirm {
            self.acceptance_confirmed = true;
            self.transition_to(ProjectStatus::Completed, at);
        } else {
            self.acceptance_requested = false;
            self.acceptance_confirmed = false;
        }
        Ok(())
    }

    /// Cancels the project regardless of its current status.
    ///
    /// Both acceptance flags are cleared: only a `Completed` project carries a
    /// confirmed acceptance.
    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.status = ProjectStatus::Cancelled;
        self.acceptance_requested = false;
        self.acceptance_confirmed = false;
        self.updated_at = Some(at);
    }

    /// Fails unless the current status is one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionViolation::StatusNotAllowed`].
    pub fn ensure_status(
        &self,
        operation: &'static str,
        allowed: &[ProjectStatus],
    ) -> Result<(), ProjectDomainError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(PreconditionViolation::StatusNotAllowed {
            operation,
            status: self.status,
        }
        .into())
    }

    pub(crate) const fn mark_persisted(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }
}
