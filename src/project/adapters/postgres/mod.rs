//! `PostgreSQL` adapters for project lifecycle persistence.

mod lease;
mod models;
mod outbox;
mod repository;
mod schema;

pub use lease::{PostgresReconciliationLock, RECONCILIATION_LEASE};
pub use outbox::{PAYMENT_CANCELLATION_MESSAGE, PostgresPaymentOutbox};
pub use repository::{PostgresProjectRepository, ProjectPgPool};
