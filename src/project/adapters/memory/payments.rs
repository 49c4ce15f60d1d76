//! Recording payment emitter.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::project::{
    domain::PaymentReference,
    ports::{PaymentCancellationEmitter, PaymentEmitterError, PaymentEmitterResult},
};

/// Payment emitter that records every notice instead of publishing it.
///
/// Setting it unavailable makes every call fail, which stands in for an
/// unreachable broker.
#[derive(Debug, Clone, Default)]
pub struct RecordingPaymentEmitter {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    emitted: Vec<PaymentReference>,
    unavailable: bool,
}

impl RecordingPaymentEmitter {
    /// Creates an emitter with no recorded notices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail (`true`) or succeed (`false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Returns the references emitted so far, oldest first.
    #[must_use]
    pub fn emitted(&self) -> Vec<PaymentReference> {
        self.lock().emitted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentCancellationEmitter for RecordingPaymentEmitter {
    async fn cancel(&self, reference: &PaymentReference) -> PaymentEmitterResult<()> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(PaymentEmitterError::publish(
                reference,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "payments broker unreachable"),
            ));
        }
        state.emitted.push(reference.clone());
        Ok(())
    }
}
