//! Project record: the unit of work posted by an employer.

use super::{Budget, CategoryId, PaymentReference, ProjectDomainError, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validated project details supplied by the employer at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetails {
    title: String,
    description: String,
    budget: Budget,
    category_id: Option<CategoryId>,
}

impl ProjectDetails {
    /// Creates validated project details.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::EmptyTitle`] when the title is empty
    /// after trimming.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        budget: Budget,
    ) -> Result<Self, ProjectDomainError> {
        let raw_title = title.into();
        let normalized_title = raw_title.trim();
        if normalized_title.is_empty() {
            return Err(ProjectDomainError::EmptyTitle);
        }

        Ok(Self {
            title: normalized_title.to_owned(),
            description: description.into(),
            budget,
            category_id: None,
        })
    }

    /// Sets the project category.
    #[must_use]
    pub const fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Returns the project title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the project description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the project budget.
    #[must_use]
    pub const fn budget(&self) -> Budget {
        self.budget
    }

    /// Returns the project category, if any.
    #[must_use]
    pub const fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }
}

/// Project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    employer_id: UserId,
    details: ProjectDetails,
    payment_reference: Option<PaymentReference>,
    assigned_freelancer_id: Option<UserId>,
    created_at: DateTime<Utc>,
    revision: u64,
}

/// Parameter object for reconstructing a persisted project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProjectData {
    /// Project identifier.
    pub id: ProjectId,
    /// Owning employer.
    pub employer_id: UserId,
    /// Persisted details.
    pub details: ProjectDetails,
    /// Payment reference, if recorded.
    pub payment_reference: Option<PaymentReference>,
    /// Assigned freelancer, if any.
    pub assigned_freelancer_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency revision.
    pub revision: u64,
}

impl Project {
    /// Creates a new project owned by `employer_id`.
    #[must_use]
    pub fn new(employer_id: UserId, details: ProjectDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ProjectId::new(),
            employer_id,
            details,
            payment_reference: None,
            assigned_freelancer_id: None,
            created_at,
            revision: 0,
        }
    }

    /// Reconstructs a project from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedProjectData) -> Self {
        Self {
            id: data.id,
            employer_id: data.employer_id,
            details: data.details,
            payment_reference: data.payment_reference,
            assigned_freelancer_id: data.assigned_freelancer_id,
            created_at: data.created_at,
            revision: data.revision,
        }
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the owning employer.
    #[must_use]
    pub const fn employer_id(&self) -> UserId {
        self.employer_id
    }

    /// Returns the project details.
    #[must_use]
    pub const fn details(&self) -> &ProjectDetails {
        &self.details
    }

    /// Returns the payment reference, if one has been recorded.
    #[must_use]
    pub const fn payment_reference(&self) -> Option<&PaymentReference> {
        self.payment_reference.as_ref()
    }

    /// Returns the assigned freelancer, if any.
    #[must_use]
    pub const fn assigned_freelancer_id(&self) -> Option<UserId> {
        self.assigned_freelancer_id
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

    /// Returns `true` when `user_id` owns the project.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.employer_id == user_id
    }

    /// Records the payment reference issued by the payments system.
    pub fn record_payment_reference(&mut self, reference: PaymentReference) {
        self.payment_reference = Some(reference);
    }

    /// Assigns the freelancer who will carry out the work.
    pub const fn assign_freelancer(&mut self, freelancer_id: UserId) {
        self.assigned_freelancer_id = Some(freelancer_id);
    }

    pub(crate) const fn mark_persisted(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }
}
