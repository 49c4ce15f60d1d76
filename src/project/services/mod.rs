//! Application services for project lifecycle orchestration.

mod reconciliation;
mod workflow;

pub use reconciliation::{
    PassOutcome, ReconciliationError, ReconciliationJob, ReconciliationReport,
    ReconciliationResult,
};
pub use workflow::{
    AcceptanceDecision, CreateProjectRequest, ProjectPaymentView, ProjectWorkflowError,
    ProjectWorkflowResult, ProjectWorkflowService,
};
