//! Port contracts for project lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by the workflow
//! service and the reconciliation job.

pub mod lock;
pub mod payments;
pub mod repository;

pub use lock::{ReconciliationLock, ReconciliationLockError, ReconciliationLockResult};
#[cfg(test)]
pub use payments::MockPaymentCancellationEmitter;
pub use payments::{PaymentCancellationEmitter, PaymentEmitterError, PaymentEmitterResult};
pub use repository::{ProjectRepository, ProjectRepositoryError, ProjectRepositoryResult, RecordKey};
