//! Shared test helpers for `PostgreSQL` integration tests.

use crate::test_helpers::day;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use hireloop::project::{
    adapters::postgres::ProjectPgPool,
    domain::{
        Application, ApplicationStatus, Budget, Lifecycle, PersistedApplicationData, Project,
        ProjectDetails, ProjectSnapshot, Schedule, UserId,
    },
};
use pg_embedded_setup_unpriv::{ClusterHandle, TestCluster};
use std::sync::OnceLock;
use tokio::runtime::Runtime;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating every table the adapters use.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_project_lifecycle/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "hireloop_test_template";

static SHARED_CLUSTER: OnceLock<Result<ClusterHandle, String>> = OnceLock::new();

/// Returns the shared embedded cluster, or `None` when it cannot start here.
pub fn shared_cluster() -> Option<&'static ClusterHandle> {
    let started = SHARED_CLUSTER.get_or_init(|| {
        let (handle, guard) = TestCluster::new_split().map_err(|err| err.to_string())?;
        handle
            .register_shutdown_on_exit()
            .map_err(|err| err.to_string())?;
        std::mem::forget(guard);
        Ok(handle)
    });
    match started {
        Ok(cluster) => Some(cluster),
        Err(err) => {
            eprintln!("SKIP-TEST-CLUSTER: failed to start PostgreSQL: {err}");
            None
        }
    }
}

/// Creates a tokio runtime for async operations in tests.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
pub fn ensure_template(cluster: &ClusterHandle) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_SCHEMA_SQL)
                .map_err(|e| eyre::eyre!("schema setup failed: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Creates a database from the template and returns a pool over it.
pub fn setup_pool(cluster: &ClusterHandle, db_name: &str) -> Result<ProjectPgPool, BoxError> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let url = cluster.connection().database_url(db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    Pool::builder()
        .max_size(2)
        .build(manager)
        .map_err(|e| Box::new(e) as BoxError)
}

/// Drops the test database when the test ends, even on panic.
///
/// Declare it before anything holding the pool so the pool closes first.
pub struct CleanupGuard {
    cluster: &'static ClusterHandle,
    db_name: String,
}

impl CleanupGuard {
    pub const fn new(cluster: &'static ClusterHandle, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(&*self.db_name) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// A migrated database private to one test.
pub struct TestDatabase {
    pub pool: ProjectPgPool,
    _guard: CleanupGuard,
}

impl TestDatabase {
    /// Creates a database named after `label` and a unique suffix.
    pub fn create(cluster: &'static ClusterHandle, label: &str) -> Self {
        ensure_template(cluster).expect("template setup");
        let db_name = format!("test_{label}_{}", uuid::Uuid::new_v4().simple());
        let guard = CleanupGuard::new(cluster, db_name.clone());
        let pool = setup_pool(cluster, &db_name).expect("pool setup");
        Self {
            pool,
            _guard: guard,
        }
    }

    /// Opens a direct connection for assertions on raw rows.
    pub fn connection(&self) -> diesel::r2d2::PooledConnection<ConnectionManager<PgConnection>> {
        self.pool.get().expect("pooled connection")
    }
}

/// Applications open on day 1 and close on day 10; work runs day 12 to 30.
pub fn schedule() -> Schedule {
    Schedule::new(day(1), day(10), day(12), day(30)).expect("ordered schedule")
}

/// A freshly posted project with no applications.
pub fn posted_project() -> ProjectSnapshot {
    let details = ProjectDetails::new(
        "Port the billing service",
        "Move invoices to the new ledger",
        Budget::from_minor_units(420_000).expect("valid budget"),
    )
    .expect("valid details");
    let project = Project::new(UserId::new(), details, day(0));
    let lifecycle = Lifecycle::new(project.id(), schedule(), day(0));
    ProjectSnapshot::new(project, lifecycle, Vec::new())
}

/// A posted project carrying one application per entry of `statuses`.
pub fn project_with_applications(statuses: &[ApplicationStatus]) -> ProjectSnapshot {
    let posted = posted_project();
    let applications = statuses
        .iter()
        .zip(0_i64..)
        .map(|(status, hour)| {
            Application::from_persisted(PersistedApplicationData {
                id: hireloop::project::domain::ApplicationId::new(),
                project_id: posted.id(),
                freelancer_id: UserId::new(),
                status: *status,
                created_at: day(1) + chrono::TimeDelta::hours(hour),
                revision: 0,
            })
        })
        .collect();
    ProjectSnapshot::new(
        posted.project().clone(),
        posted.lifecycle().clone(),
        applications,
    )
}

/// Returns `project` as reconciled at `at` with a seven-day grace period.
pub fn reconciled(project: &ProjectSnapshot, at: chrono::DateTime<chrono::Utc>) -> ProjectSnapshot {
    let mut next = project.clone();
    next.reconcile(at, hireloop::project::domain::GracePeriod::from_days(7));
    next
}
