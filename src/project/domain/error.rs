//! Error types for project domain validation and parsing.

use super::{ApplicationId, ProjectId, ProjectStatus, UserId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing domain project values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectDomainError {
    /// The project title is empty after trimming.
    #[error("project title must not be empty")]
    EmptyTitle,

    /// The budget amount is negative.
    #[error("budget must not be negative, got {0} minor units")]
    NegativeBudget(i64),

    /// The budget text is not a valid decimal amount.
    #[error("invalid budget '{0}', expected a non-negative amount with at most two decimals")]
    InvalidBudget(String),

    /// The payment reference is empty after trimming.
    #[error("payment reference must not be empty")]
    EmptyPaymentReference,

    /// Two schedule boundaries are out of order.
    #[error("schedule boundary {earlier_name} ({earlier}) must not be after {later_name} ({later})")]
    InvalidSchedule {
        /// Name of the boundary expected to come first.
        earlier_name: &'static str,
        /// Value of the boundary expected to come first.
        earlier: DateTime<Utc>,
        /// Name of the boundary expected to come second.
        later_name: &'static str,
        /// Value of the boundary expected to come second.
        later: DateTime<Utc>,
    },

    /// The application does not belong to the project.
    #[error("application {0} not found on this project")]
    UnknownApplication(ApplicationId),

    /// The freelancer already applied to the project.
    #[error("freelancer {freelancer_id} already applied to project {project_id}")]
    DuplicateApplication {
        /// Target project.
        project_id: ProjectId,
        /// Applying freelancer.
        freelancer_id: UserId,
    },

    /// A business precondition of a workflow operation does not hold.
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),
}

/// Business preconditions checked by the acceptance and application workflow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// The lifecycle status does not allow the operation.
    #[error("cannot {operation} while project is {status}")]
    StatusNotAllowed {
        /// Operation that was attempted.
        operation: &'static str,
        /// Status observed when the operation was attempted.
        status: ProjectStatus,
    },

    /// A freelancer is already assigned to the project.
    #[error("project {0} already has an assigned freelancer")]
    FreelancerAlreadyAssigned(ProjectId),

    /// Another application of the project is already accepted.
    #[error("application {0} is already accepted for this project")]
    AnotherApplicationAccepted(ApplicationId),

    /// The application is not currently accepted.
    #[error("application {0} is not accepted")]
    ApplicationNotAccepted(ApplicationId),

    /// The application is not pending.
    #[error("application {0} is not pending")]
    ApplicationNotPending(ApplicationId),

    /// The freelancer has not requested acceptance.
    #[error("acceptance has not been requested for project {0}")]
    AcceptanceNotRequested(ProjectId),
}

/// Error returned while parsing project statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown project status: {0}")]
pub struct ParseProjectStatusError(pub String);

/// Error returned while parsing application statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown application status: {0}")]
pub struct ParseApplicationStatusError(pub String);
