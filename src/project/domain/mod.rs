//! Domain model for project lifecycle management.
//!
//! The project domain models the temporal status machine of a project, the
//! application and acceptance workflow around it, and the ordered rule table
//! the reconciliation pass evaluates. Nothing here performs I/O.

mod application;
mod changes;
mod error;
mod ids;
mod lifecycle;
mod project;
mod rules;
mod snapshot;

pub use application::{Application, ApplicationStatus, PersistedApplicationData};
pub use changes::ProjectChangeSet;
pub use error::{
    ParseApplicationStatusError, ParseProjectStatusError, PreconditionViolation,
    ProjectDomainError,
};
pub use ids::{ApplicationId, Budget, CategoryId, PaymentReference, ProjectId, UserId};
pub use lifecycle::{Lifecycle, PersistedLifecycleData, ProjectStatus, Schedule};
pub use project::{PersistedProjectData, Project, ProjectDetails};
pub use rules::{
    Decision, GracePeriod, SideEffect, TRANSITION_RULES, TransitionFacts, TransitionRule,
    evaluate, matching_rule,
};
pub use snapshot::ProjectSnapshot;
