//! Outbox table for payment cancellation notices.
//!
//! Each notice is inserted on its own pooled connection once the owning
//! cancellation has committed; an external relay drains pending rows.

use super::{models::NewPaymentCancellationRow, repository::ProjectPgPool, schema::payment_cancellation_outbox};
use crate::project::{
    domain::PaymentReference,
    ports::{PaymentCancellationEmitter, PaymentEmitterError, PaymentEmitterResult},
};
use async_trait::async_trait;
use diesel::prelude::*;
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Message type written into each outbox payload.
pub const PAYMENT_CANCELLATION_MESSAGE: &str = "payment_cancellation";

/// Payment emitter that enqueues notices in `payment_cancellation_outbox`.
///
/// A relay outside this crate publishes queued rows to the payments broker
/// and stamps `published_at`.
pub struct PostgresPaymentOutbox<C: Clock + Send + Sync> {
    pool: ProjectPgPool,
    clock: Arc<C>,
}

impl<C: Clock + Send + Sync> PostgresPaymentOutbox<C> {
    /// Creates an outbox writer.
    #[must_use]
    pub const fn new(pool: ProjectPgPool, clock: Arc<C>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl<C: Clock + Send + Sync + 'static> PaymentCancellationEmitter for PostgresPaymentOutbox<C> {
    async fn cancel(&self, reference: &PaymentReference) -> PaymentEmitterResult<()> {
        let row = NewPaymentCancellationRow {
            id: Uuid::new_v4(),
            payment_reference: reference.as_str().to_owned(),
            payload: json!({
                "type": PAYMENT_CANCELLATION_MESSAGE,
                "payment_reference": reference.as_str(),
            }),
            created_at: self.clock.utc(),
        };
        let pool = self.pool.clone();
        let owned_reference = reference.clone();

        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| PaymentEmitterError::publish(&owned_reference, err))?;
            diesel::insert_into(payment_cancellation_outbox::table)
                .values(&row)
                .execute(&mut connection)
                .map_err(|err| PaymentEmitterError::publish(&owned_reference, err))?;
            Ok(())
        })
        .await
        .map_err(|err| PaymentEmitterError::publish(reference, err))?
    }
}
