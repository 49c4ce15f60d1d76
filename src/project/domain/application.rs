//! Freelancer applications to projects.

use super::{ApplicationId, ParseApplicationStatusError, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Awaiting the employer's decision.
    Pending,
    /// Chosen by the employer.
    Accepted,
    /// Lost to another applicant.
    Rejected,
}

impl ApplicationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for ApplicationStatus {
    type Error = ParseApplicationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseApplicationStatusError(value.to_owned())),
        }
    }
}

/// A freelancer's bid for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    id: ApplicationId,
    project_id: ProjectId,
    freelancer_id: UserId,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
    revision: u64,
}

/// Parameter object for reconstructing a persisted application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedApplicationData {
    /// Application identifier.
    pub id: ApplicationId,
    /// Target project.
    pub project_id: ProjectId,
    /// Applying freelancer.
    pub freelancer_id: UserId,
    /// Persisted status.
    pub status: ApplicationStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency revision.
    pub revision: u64,
}

impl Application {
    /// Creates a pending application.
    #[must_use]
    pub fn new(project_id: ProjectId, freelancer_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ApplicationId::new(),
            project_id,
            freelancer_id,
            status: ApplicationStatus::Pending,
            created_at,
            revision: 0,
        }
    }

    /// Reconstructs an application from persisted storage.
    #[must_use]
    pub const fn from_persisted(data: PersistedApplicationData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            freelancer_id: data.freelancer_id,
            status: data.status,
            created_at: data.created_at,
            revision: data.revision,
        }
    }

    /// Returns the application identifier.
    #[must_use]
    pub const fn id(&self) -> ApplicationId {
        self.id
    }

    /// Returns the target project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the applying freelancer.
    #[must_use]
    pub const fn freelancer_id(&self) -> UserId {
        self.freelancer_id
    }

    /// Returns the application status.
    #[must_use]
    pub const fn status(&self) -> ApplicationStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the revision this value was read at.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` when the application is accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == ApplicationStatus::Accepted
    }

    pub(crate) const fn set_status(&mut self, status: ApplicationStatus) {
        self.status = status;
    }

    pub(crate) const fn mark_persisted(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }
}
