//! Payment cancellation port.

use crate::project::domain::PaymentReference;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for payment emitter operations.
pub type PaymentEmitterResult<T> = Result<T, PaymentEmitterError>;

/// Publishes payment-cancellation notices to the external payments system.
///
/// Delivery is fire-and-forget with respect to the payments system's own
/// processing, but a failure to hand the notice over (for example an
/// unreachable broker) is reported synchronously.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentCancellationEmitter: Send + Sync {
    /// Publishes one cancellation notice for `reference`.
    async fn cancel(&self, reference: &PaymentReference) -> PaymentEmitterResult<()>;
}

/// Errors returned by payment emitter adapters.
#[derive(Debug, Clone, Error)]
pub enum PaymentEmitterError {
    /// The notice could not be handed to the payments system.
    #[error("failed to publish payment cancellation for {reference}: {cause}")]
    Publish {
        /// Reference the notice was for.
        reference: PaymentReference,
        /// Underlying failure.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl PaymentEmitterError {
    /// Wraps a publishing failure for `reference`.
    pub fn publish(
        reference: &PaymentReference,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Publish {
            reference: reference.clone(),
            cause: Arc::new(err),
        }
    }
}
