//! Snapshot storage, revision guards and uniqueness against `PostgreSQL`.

use super::helpers::{
    TestDatabase, posted_project, project_with_applications, reconciled, shared_cluster,
    test_runtime,
};
use crate::test_helpers::day;
use hireloop::project::{
    adapters::postgres::PostgresProjectRepository,
    domain::{Application, ApplicationStatus, ProjectChangeSet, ProjectSnapshot, ProjectStatus, UserId},
    ports::{ProjectRepository, ProjectRepositoryError, RecordKey},
};
use rstest::rstest;

#[rstest]
fn created_project_is_read_back_whole() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "round_trip");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let project =
        project_with_applications(&[ApplicationStatus::Pending, ApplicationStatus::Pending]);
    let rt = test_runtime();

    rt.block_on(repository.create(&project))
        .expect("create should succeed");
    let stored = rt
        .block_on(repository.find_snapshot(project.id()))
        .expect("lookup should succeed")
        .expect("project should exist");

    assert_eq!(stored, project);
    let by_project = rt
        .block_on(repository.find_applications_by_project(project.id()))
        .expect("listing should succeed");
    assert_eq!(by_project.as_slice(), project.applications());
}

#[rstest]
fn creating_the_same_project_twice_is_rejected() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "duplicate_project");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let project = posted_project();
    let rt = test_runtime();

    rt.block_on(repository.create(&project))
        .expect("first create should succeed");
    let result = rt.block_on(repository.create(&project));

    assert!(
        matches!(result, Err(ProjectRepositoryError::DuplicateProject(id)) if id == project.id()),
        "expected DuplicateProject, got: {result:?}"
    );
}

#[rstest]
fn repeated_freelancer_pair_is_duplicate_application() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "duplicate_application");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let posted = posted_project();
    let freelancer = UserId::new();
    let project = ProjectSnapshot::new(
        posted.project().clone(),
        posted.lifecycle().clone(),
        vec![
            Application::new(posted.id(), freelancer, day(1)),
            Application::new(posted.id(), freelancer, day(2)),
        ],
    );
    let rt = test_runtime();

    let result = rt.block_on(repository.create(&project));

    assert!(
        matches!(
            result,
            Err(ProjectRepositoryError::DuplicateApplication { project_id, freelancer_id })
                if project_id == project.id() && freelancer_id == freelancer
        ),
        "expected DuplicateApplication, got: {result:?}"
    );
    let stored = rt
        .block_on(repository.find_snapshot(project.id()))
        .expect("lookup should succeed");
    assert!(stored.is_none(), "failed create must not leave rows behind");
}

#[rstest]
fn store_refuses_a_second_accepted_application() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "two_accepted");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let project =
        project_with_applications(&[ApplicationStatus::Accepted, ApplicationStatus::Accepted]);
    let rt = test_runtime();

    let result = rt.block_on(repository.create(&project));

    assert!(
        matches!(result, Err(ProjectRepositoryError::Persistence(_))),
        "expected the one-accepted index to reject the row, got: {result:?}"
    );
    let stored = rt
        .block_on(repository.find_snapshot(project.id()))
        .expect("lookup should succeed");
    assert!(stored.is_none());
}

#[rstest]
fn stale_change_set_conflicts_and_keeps_the_winner() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "stale_commit");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let project =
        project_with_applications(&[ApplicationStatus::Pending, ApplicationStatus::Pending]);
    let rt = test_runtime();
    rt.block_on(repository.create(&project))
        .expect("create should succeed");
    let opened = reconciled(&project, day(2));
    rt.block_on(repository.commit(&ProjectChangeSet::between(&project, &opened)))
        .expect("opening applications should commit");
    let loaded = rt
        .block_on(repository.find_snapshot(project.id()))
        .expect("lookup should succeed")
        .expect("project should exist");
    assert_eq!(loaded.lifecycle().status(), ProjectStatus::AcceptingApplications);
    assert_eq!(loaded.lifecycle().revision(), 1);

    let winner = loaded.applications().first().expect("first application").id();
    let loser = loaded.applications().last().expect("second application").id();
    let mut first = loaded.clone();
    first.accept_application(winner).expect("first accept");
    let mut second = loaded.clone();
    second.accept_application(loser).expect("second accept");

    rt.block_on(repository.commit(&ProjectChangeSet::between(&loaded, &first)))
        .expect("first commit should succeed");
    let result = rt.block_on(repository.commit(&ProjectChangeSet::between(&loaded, &second)));

    assert!(
        matches!(result, Err(ProjectRepositoryError::Conflict(_))),
        "expected Conflict, got: {result:?}"
    );
    let stored = rt
        .block_on(repository.find_snapshot(project.id()))
        .expect("lookup should succeed")
        .expect("project should exist");
    assert_eq!(
        stored.accepted_application().map(Application::id),
        Some(winner)
    );
    assert_eq!(
        stored
            .application(loser)
            .map(Application::status),
        Some(ApplicationStatus::Pending)
    );
}

#[rstest]
fn commit_for_unknown_project_is_not_found() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "missing_commit");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let project = posted_project();
    let mut cancelled = project.clone();
    cancelled.cancel(day(3));
    let rt = test_runtime();

    let result = rt.block_on(repository.commit(&ProjectChangeSet::between(&project, &cancelled)));

    assert!(
        matches!(
            result,
            Err(ProjectRepositoryError::NotFound(RecordKey::Lifecycle(id))) if id == project.id()
        ),
        "expected NotFound, got: {result:?}"
    );
}

#[rstest]
fn reassignment_commits_across_all_three_tables() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "reassignment");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let project =
        project_with_applications(&[ApplicationStatus::Accepted, ApplicationStatus::Pending]);
    let accepted = project
        .accepted_application()
        .map(Application::freelancer_id)
        .expect("accepted application");
    let rt = test_runtime();
    rt.block_on(repository.create(&project))
        .expect("create should succeed");

    let started = reconciled(&project, day(13));
    let changes = ProjectChangeSet::between(&project, &started);
    rt.block_on(repository.commit(&changes))
        .expect("reassignment should commit");
    let stored = rt
        .block_on(repository.find_snapshot(project.id()))
        .expect("lookup should succeed")
        .expect("project should exist");

    assert_eq!(stored.lifecycle().status(), ProjectStatus::InProgress);
    assert_eq!(stored.lifecycle().updated_at(), Some(day(13)));
    assert_eq!(stored.project().assigned_freelancer_id(), Some(accepted));
    assert_eq!(stored.project().revision(), 1);
    assert!(
        stored
            .applications()
            .iter()
            .filter(|application| !application.is_accepted())
            .all(|application| application.status() == ApplicationStatus::Rejected)
    );

    let replay = rt.block_on(repository.commit(&changes));
    assert!(
        matches!(replay, Err(ProjectRepositoryError::Conflict(_))),
        "replaying a committed change set must conflict, got: {replay:?}"
    );
}

#[rstest]
fn open_snapshots_leave_out_terminal_projects() {
    let Some(cluster) = shared_cluster() else {
        return;
    };
    let database = TestDatabase::create(cluster, "open_snapshots");
    let repository = PostgresProjectRepository::new(database.pool.clone());
    let open = posted_project();
    let closed = posted_project();
    let rt = test_runtime();
    rt.block_on(repository.create(&open))
        .expect("create open project");
    rt.block_on(repository.create(&closed))
        .expect("create closed project");
    let mut cancelled = closed.clone();
    cancelled.cancel(day(3));
    rt.block_on(repository.commit(&ProjectChangeSet::between(&closed, &cancelled)))
        .expect("cancel should commit");

    let listed = rt
        .block_on(repository.find_open_snapshots())
        .expect("listing should succeed");

    let ids: Vec<_> = listed.iter().map(ProjectSnapshot::id).collect();
    assert_eq!(ids, vec![open.id()]);
}
