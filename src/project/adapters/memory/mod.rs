//! In-memory adapters for project lifecycle tests and local runs.

mod lock;
mod payments;
mod repository;

pub use lock::InMemoryReconciliationLock;
pub use payments::RecordingPaymentEmitter;
pub use repository::InMemoryProjectRepository;
