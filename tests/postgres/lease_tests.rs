//! Run lease behaviour on the `reconciliation_leases` table.

use super::helpers::{TestDatabase, posted_project, shared_cluster, test_runtime};
use crate::test_helpers::{ManualClock, day};
use hireloop::config::LifecycleConfig;
use hireloop::project::{
    adapters::postgres::{PostgresProjectRepository, PostgresReconciliationLock},
    domain::ProjectStatus,
    ports::{ProjectRepository, ReconciliationLock},
    services::{PassOutcome, ReconciliationJob},
};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const LEASE: Duration = Duration::from_secs(60);

#[rstest]
fn held_lease_excludes_other_holders_until_released() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "lease_exclusive");
    let lock = PostgresReconciliationLock::new(database.pool.clone());
    let rt = test_runtime();

    assert!(rt.block_on(lock.try_acquire("alpha", LEASE)).expect("acquire"));
    assert!(!rt.block_on(lock.try_acquire("beta", LEASE)).expect("acquire"));
    assert!(
        rt.block_on(lock.try_acquire("alpha", LEASE)).expect("renew"),
        "the holder renews its own lease"
    );

    rt.block_on(lock.release("beta")).expect("foreign release");
    assert!(
        !rt.block_on(lock.try_acquire("beta", LEASE)).expect("acquire"),
        "only the holder can release"
    );

    rt.block_on(lock.release("alpha")).expect("release");
    assert!(rt.block_on(lock.try_acquire("beta", LEASE)).expect("acquire"));
}

#[rstest]
fn expired_lease_is_taken_over() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "lease_expiry");
    let lock = PostgresReconciliationLock::new(database.pool.clone());
    let rt = test_runtime();

    assert!(
        rt.block_on(lock.try_acquire("crashed", Duration::from_millis(1)))
            .expect("acquire")
    );
    std::thread::sleep(Duration::from_millis(50));

    assert!(rt.block_on(lock.try_acquire("successor", LEASE)).expect("takeover"));
    assert!(!rt.block_on(lock.try_acquire("crashed", LEASE)).expect("acquire"));
}

#[rstest]
fn named_leases_do_not_contend() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "lease_names");
    let reconciliation = PostgresReconciliationLock::new(database.pool.clone());
    let other = PostgresReconciliationLock::named(database.pool.clone(), "nightly_export");
    let rt = test_runtime();

    assert!(rt.block_on(other.try_acquire("alpha", LEASE)).expect("acquire"));
    assert!(rt.block_on(reconciliation.try_acquire("beta", LEASE)).expect("acquire"));
}

#[rstest]
fn job_skips_while_another_process_holds_the_lease() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "lease_job");
    let repository = Arc::new(PostgresProjectRepository::new(database.pool.clone()));
    let lock = Arc::new(PostgresReconciliationLock::new(database.pool.clone()));
    let clock = Arc::new(ManualClock::at(day(2)));
    let job = ReconciliationJob::new(
        Arc::clone(&repository),
        Arc::clone(&lock),
        clock,
        LifecycleConfig::default(),
    );
    let project = posted_project();
    let rt = test_runtime();
    rt.block_on(repository.create(&project))
        .expect("create should succeed");
    assert!(
        rt.block_on(lock.try_acquire("another-process", LEASE))
            .expect("acquire")
    );

    let skipped = rt
        .block_on(job.run_pass(&CancellationToken::new()))
        .expect("pass should not fail");
    assert_eq!(skipped, PassOutcome::Skipped);

    rt.block_on(lock.release("another-process"))
        .expect("release");
    let outcome = rt
        .block_on(job.run_pass(&CancellationToken::new()))
        .expect("pass should succeed");
    let PassOutcome::Completed(report) = outcome else {
        panic!("expected a completed pass once the lease was free");
    };
    assert_eq!(report.transitions, 1);
    let stored = rt
        .block_on(repository.find_lifecycle(project.id()))
        .expect("lookup should succeed")
        .expect("lifecycle should exist");
    assert_eq!(stored.status(), ProjectStatus::AcceptingApplications);
    assert!(
        rt.block_on(lock.try_acquire("another-process", LEASE))
            .expect("acquire"),
        "the job releases the lease after its pass"
    );
}
