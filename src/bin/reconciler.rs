//! Runs the project reconciliation job against `PostgreSQL`.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://... reconciler
//! ```
//!
//! Tunables are read from `HIRELOOP_*` environment variables (see
//! [`hireloop::config`]); a `.env` file in the working directory is loaded
//! first when present. Log filtering follows `RUST_LOG` and defaults to
//! `hireloop=info`. The process stops after the in-flight pass when it
//! receives Ctrl-C.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use hireloop::config::LifecycleConfig;
use hireloop::project::adapters::postgres::{PostgresProjectRepository, PostgresReconciliationLock};
use hireloop::project::services::ReconciliationJob;
use mockable::DefaultClock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DATABASE_URL_VAR: &str = "DATABASE_URL";
const DEFAULT_LOG_FILTER: &str = "hireloop=info";

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(err.into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = LifecycleConfig::from_env()?;
    let database_url = std::env::var(DATABASE_URL_VAR)
        .map_err(|err| format!("{DATABASE_URL_VAR} must be set: {err}"))?;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .connection_timeout(config.io_timeout)
        .build(manager)?;

    let repository = Arc::new(PostgresProjectRepository::new(pool.clone()));
    let lock = Arc::new(PostgresReconciliationLock::new(pool));
    let job = ReconciliationJob::new(repository, lock, Arc::new(DefaultClock), config);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown requested");
        signal_cancel.cancel();
    });

    job.run(cancel).await;
    Ok(())
}
