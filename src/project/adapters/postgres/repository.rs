//! `PostgreSQL` repository implementation for project lifecycle storage.

use super::{
    models::{ApplicationRow, LifecycleRow, ProjectRow},
    schema::{project_applications, project_lifecycles, projects},
};
use crate::project::{
    domain::{
        Application, ApplicationId, ApplicationStatus, Budget, CategoryId, Lifecycle,
        PaymentReference, PersistedApplicationData, PersistedLifecycleData, PersistedProjectData,
        Project, ProjectChangeSet, ProjectDetails, ProjectId, ProjectSnapshot, ProjectStatus,
        Schedule, UserId,
    },
    ports::{ProjectRepository, ProjectRepositoryError, ProjectRepositoryResult, RecordKey},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;

/// One application per freelancer and project.
const FREELANCER_UNIQUE_CONSTRAINT: &str = "uq_project_applications_freelancer";

/// `PostgreSQL` connection pool type used by project adapters.
pub type ProjectPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed project repository.
///
/// Each change set is applied inside one transaction. Updates and deletes are
/// conditional on the revision read by the caller, so a stale change set
/// affects zero rows and rolls the whole transaction back.
#[derive(Debug, Clone)]
pub struct PostgresProjectRepository {
    pool: ProjectPgPool,
}

impl PostgresProjectRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ProjectPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ProjectRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ProjectRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ProjectRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ProjectRepositoryError::persistence)?
    }
}

impl From<DieselError> for ProjectRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn create(&self, snapshot: &ProjectSnapshot) -> ProjectRepositoryResult<()> {
        let project_id = snapshot.id();
        let project_row = to_project_row(snapshot.project())?;
        let lifecycle_row = to_lifecycle_row(snapshot.lifecycle())?;
        let application_rows = snapshot
            .applications()
            .iter()
            .map(to_application_row)
            .collect::<ProjectRepositoryResult<Vec<_>>>()?;

        self.run_blocking(move |connection| {
            connection.transaction::<_, ProjectRepositoryError, _>(|tx| {
                diesel::insert_into(projects::table)
                    .values(&project_row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            ProjectRepositoryError::DuplicateProject(project_id)
                        }
                        other => ProjectRepositoryError::persistence(other),
                    })?;
                diesel::insert_into(project_lifecycles::table)
                    .values(&lifecycle_row)
                    .execute(tx)?;
                for row in &application_rows {
                    insert_application(tx, row)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn find_snapshot(&self, id: ProjectId) -> ProjectRepositoryResult<Option<ProjectSnapshot>> {
        self.run_blocking(move |connection| {
            connection
                .build_transaction()
                .read_only()
                .repeatable_read()
                .run::<_, ProjectRepositoryError, _>(|tx| {
                    let mut snapshots = load_snapshots(tx, &[id.into_inner()])?;
                    Ok(snapshots.pop())
                })
        })
        .await
    }

    async fn find_open_snapshots(&self) -> ProjectRepositoryResult<Vec<ProjectSnapshot>> {
        self.run_blocking(|connection| {
            connection
                .build_transaction()
                .read_only()
                .repeatable_read()
                .run::<_, ProjectRepositoryError, _>(|tx| {
                    let terminal: Vec<&str> = ProjectStatus::TERMINAL
                        .iter()
                        .map(|status| status.as_str())
                        .collect();
                    let open_ids: Vec<uuid::Uuid> = project_lifecycles::table
                        .filter(project_lifecycles::status.ne_all(terminal))
                        .select(project_lifecycles::project_id)
                        .load(tx)?;
                    load_snapshots(tx, &open_ids)
                })
        })
        .await
    }

    async fn find_project(&self, id: ProjectId) -> ProjectRepositoryResult<Option<Project>> {
        self.run_blocking(move |connection| {
            let row = projects::table
                .filter(projects::id.eq(id.into_inner()))
                .select(ProjectRow::as_select())
                .first::<ProjectRow>(connection)
                .optional()?;
            row.map(row_to_project).transpose()
        })
        .await
    }

    async fn find_lifecycle(
        &self,
        project_id: ProjectId,
    ) -> ProjectRepositoryResult<Option<Lifecycle>> {
        self.run_blocking(move |connection| {
            let row = project_lifecycles::table
                .filter(project_lifecycles::project_id.eq(project_id.into_inner()))
                .select(LifecycleRow::as_select())
                .first::<LifecycleRow>(connection)
                .optional()?;
            row.map(row_to_lifecycle).transpose()
        })
        .await
    }

    async fn find_application(
        &self,
        id: ApplicationId,
    ) -> ProjectRepositoryResult<Option<Application>> {
        self.run_blocking(move |connection| {
            let row = project_applications::table
                .filter(project_applications::id.eq(id.into_inner()))
                .select(ApplicationRow::as_select())
                .first::<ApplicationRow>(connection)
                .optional()?;
            row.map(row_to_application).transpose()
        })
        .await
    }

    async fn find_applications_by_project(
        &self,
        project_id: ProjectId,
    ) -> ProjectRepositoryResult<Vec<Application>> {
        self.run_blocking(move |connection| {
            project_applications::table
                .filter(project_applications::project_id.eq(project_id.into_inner()))
                .order((project_applications::created_at.asc(), project_applications::id.asc()))
                .select(ApplicationRow::as_select())
                .load::<ApplicationRow>(connection)?
                .into_iter()
                .map(row_to_application)
                .collect()
        })
        .await
    }

    async fn find_application_by_freelancer(
        &self,
        project_id: ProjectId,
        freelancer_id: UserId,
    ) -> ProjectRepositoryResult<Option<Application>> {
        self.run_blocking(move |connection| {
            let row = project_applications::table
                .filter(project_applications::project_id.eq(project_id.into_inner()))
                .filter(project_applications::freelancer_id.eq(freelancer_id.into_inner()))
                .select(ApplicationRow::as_select())
                .first::<ApplicationRow>(connection)
                .optional()?;
            row.map(row_to_application).transpose()
        })
        .await
    }

    async fn commit(&self, changes: &ProjectChangeSet) -> ProjectRepositoryResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let changes = changes.clone();
        self.run_blocking(move |connection| {
            connection.transaction::<_, ProjectRepositoryError, _>(|tx| apply_changes(tx, &changes))
        })
        .await
    }
}

fn apply_changes(tx: &mut PgConnection, changes: &ProjectChangeSet) -> ProjectRepositoryResult<()> {
    for project in changes.projects() {
        let row = to_project_row(project)?;
        let updated = diesel::update(
            projects::table
                .filter(projects::id.eq(row.id))
                .filter(projects::revision.eq(row.revision)),
        )
        .set((
            projects::title.eq(&row.title),
            projects::description.eq(&row.description),
            projects::budget_minor_units.eq(row.budget_minor_units),
            projects::category_id.eq(row.category_id),
            projects::payment_reference.eq(&row.payment_reference),
            projects::assigned_freelancer_id.eq(row.assigned_freelancer_id),
            projects::revision.eq(projects::revision + 1),
        ))
        .execute(tx)?;
        ensure_written(tx, updated, RecordKey::Project(project.id()))?;
    }

    for lifecycle in changes.lifecycles() {
        let row = to_lifecycle_row(lifecycle)?;
        let updated = diesel::update(
            project_lifecycles::table
                .filter(project_lifecycles::project_id.eq(row.project_id))
                .filter(project_lifecycles::revision.eq(row.revision)),
        )
        .set((
            project_lifecycles::status.eq(&row.status),
            project_lifecycles::acceptance_requested.eq(row.acceptance_requested),
            project_lifecycles::acceptance_confirmed.eq(row.acceptance_confirmed),
            project_lifecycles::updated_at.eq(row.updated_at),
            project_lifecycles::revision.eq(project_lifecycles::revision + 1),
        ))
        .execute(tx)?;
        ensure_written(tx, updated, RecordKey::Lifecycle(lifecycle.project_id()))?;
    }

    for application in changes.deleted_applications() {
        let row = to_application_row(application)?;
        let deleted = diesel::delete(
            project_applications::table
                .filter(project_applications::id.eq(row.id))
                .filter(project_applications::revision.eq(row.revision)),
        )
        .execute(tx)?;
        ensure_written(tx, deleted, RecordKey::Application(application.id()))?;
    }

    for application in changes.updated_applications() {
        let row = to_application_row(application)?;
        let updated = diesel::update(
            project_applications::table
                .filter(project_applications::id.eq(row.id))
                .filter(project_applications::revision.eq(row.revision)),
        )
        .set((
            project_applications::status.eq(&row.status),
            project_applications::revision.eq(project_applications::revision + 1),
        ))
        .execute(tx)?;
        ensure_written(tx, updated, RecordKey::Application(application.id()))?;
    }

    for application in changes.inserted_applications() {
        let mut row = to_application_row(application)?;
        row.revision = row.revision.saturating_add(1);
        insert_application(tx, &row)?;
    }
    Ok(())
}

/// Distinguishes a stale revision from a missing record after a conditional
/// write touched no rows.
fn ensure_written(
    tx: &mut PgConnection,
    affected: usize,
    key: RecordKey,
) -> ProjectRepositoryResult<()> {
    if affected > 0 {
        return Ok(());
    }
    let exists = match key {
        RecordKey::Project(id) => diesel::select(diesel::dsl::exists(
            projects::table.filter(projects::id.eq(id.into_inner())),
        ))
        .get_result::<bool>(tx)?,
        RecordKey::Lifecycle(id) => diesel::select(diesel::dsl::exists(
            project_lifecycles::table.filter(project_lifecycles::project_id.eq(id.into_inner())),
        ))
        .get_result::<bool>(tx)?,
        RecordKey::Application(id) => diesel::select(diesel::dsl::exists(
            project_applications::table.filter(project_applications::id.eq(id.into_inner())),
        ))
        .get_result::<bool>(tx)?,
    };
    if exists {
        Err(ProjectRepositoryError::Conflict(key))
    } else {
        Err(ProjectRepositoryError::NotFound(key))
    }
}

fn insert_application(tx: &mut PgConnection, row: &ApplicationRow) -> ProjectRepositoryResult<()> {
    diesel::insert_into(project_applications::table)
        .values(row)
        .execute(tx)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if info.constraint_name() == Some(FREELANCER_UNIQUE_CONSTRAINT) =>
            {
                ProjectRepositoryError::DuplicateApplication {
                    project_id: ProjectId::from_uuid(row.project_id),
                    freelancer_id: UserId::from_uuid(row.freelancer_id),
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                ProjectRepositoryError::NotFound(RecordKey::Project(ProjectId::from_uuid(
                    row.project_id,
                )))
            }
            other => ProjectRepositoryError::persistence(other),
        })?;
    Ok(())
}

fn load_snapshots(
    connection: &mut PgConnection,
    ids: &[uuid::Uuid],
) -> ProjectRepositoryResult<Vec<ProjectSnapshot>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let project_rows = projects::table
        .filter(projects::id.eq_any(ids))
        .order((projects::created_at.asc(), projects::id.asc()))
        .select(ProjectRow::as_select())
        .load::<ProjectRow>(connection)?;
    let mut lifecycles: HashMap<uuid::Uuid, LifecycleRow> = project_lifecycles::table
        .filter(project_lifecycles::project_id.eq_any(ids))
        .select(LifecycleRow::as_select())
        .load::<LifecycleRow>(connection)?
        .into_iter()
        .map(|row| (row.project_id, row))
        .collect();
    let mut applications: HashMap<uuid::Uuid, Vec<Application>> = HashMap::new();
    for row in project_applications::table
        .filter(project_applications::project_id.eq_any(ids))
        .select(ApplicationRow::as_select())
        .load::<ApplicationRow>(connection)?
    {
        let project_id = row.project_id;
        applications
            .entry(project_id)
            .or_default()
            .push(row_to_application(row)?);
    }

    let mut snapshots = Vec::with_capacity(project_rows.len());
    for project_row in project_rows {
        let project_id = project_row.id;
        let Some(lifecycle_row) = lifecycles.remove(&project_id) else {
            return Err(ProjectRepositoryError::NotFound(RecordKey::Lifecycle(
                ProjectId::from_uuid(project_id),
            )));
        };
        snapshots.push(ProjectSnapshot::new(
            row_to_project(project_row)?,
            row_to_lifecycle(lifecycle_row)?,
            applications.remove(&project_id).unwrap_or_default(),
        ));
    }
    Ok(snapshots)
}

fn to_revision_column(revision: u64) -> ProjectRepositoryResult<i64> {
    i64::try_from(revision).map_err(ProjectRepositoryError::persistence)
}

fn from_revision_column(revision: i64) -> ProjectRepositoryResult<u64> {
    u64::try_from(revision).map_err(ProjectRepositoryError::persistence)
}

fn to_project_row(project: &Project) -> ProjectRepositoryResult<ProjectRow> {
    let details = project.details();
    Ok(ProjectRow {
        id: project.id().into_inner(),
        employer_id: project.employer_id().into_inner(),
        title: details.title().to_owned(),
        description: details.description().to_owned(),
        budget_minor_units: details.budget().minor_units(),
        category_id: details.category_id().map(CategoryId::into_inner),
        payment_reference: project
            .payment_reference()
            .map(|reference| reference.as_str().to_owned()),
        assigned_freelancer_id: project.assigned_freelancer_id().map(UserId::into_inner),
        created_at: project.created_at(),
        revision: to_revision_column(project.revision())?,
    })
}

fn row_to_project(row: ProjectRow) -> ProjectRepositoryResult<Project> {
    let budget =
        Budget::from_minor_units(row.budget_minor_units).map_err(ProjectRepositoryError::persistence)?;
    let mut details = ProjectDetails::new(row.title, row.description, budget)
        .map_err(ProjectRepositoryError::persistence)?;
    if let Some(category_id) = row.category_id {
        details = details.with_category(CategoryId::from_uuid(category_id));
    }
    let payment_reference = row
        .payment_reference
        .map(PaymentReference::new)
        .transpose()
        .map_err(ProjectRepositoryError::persistence)?;

    Ok(Project::from_persisted(PersistedProjectData {
        id: ProjectId::from_uuid(row.id),
        employer_id: UserId::from_uuid(row.employer_id),
        details,
        payment_reference,
        assigned_freelancer_id: row.assigned_freelancer_id.map(UserId::from_uuid),
        created_at: row.created_at,
        revision: from_revision_column(row.revision)?,
    }))
}

fn to_lifecycle_row(lifecycle: &Lifecycle) -> ProjectRepositoryResult<LifecycleRow> {
    let schedule = lifecycle.schedule();
    Ok(LifecycleRow {
        project_id: lifecycle.project_id().into_inner(),
        status: lifecycle.status().as_str().to_owned(),
        applications_start: schedule.applications_start(),
        applications_deadline: schedule.applications_deadline(),
        work_start: schedule.work_start(),
        work_deadline: schedule.work_deadline(),
        acceptance_requested: lifecycle.acceptance_requested(),
        acceptance_confirmed: lifecycle.acceptance_confirmed(),
        created_at: lifecycle.created_at(),
        updated_at: lifecycle.updated_at(),
        revision: to_revision_column(lifecycle.revision())?,
    })
}

fn row_to_lifecycle(row: LifecycleRow) -> ProjectRepositoryResult<Lifecycle> {
    let status =
        ProjectStatus::try_from(row.status.as_str()).map_err(ProjectRepositoryError::persistence)?;
    Ok(Lifecycle::from_persisted(PersistedLifecycleData {
        project_id: ProjectId::from_uuid(row.project_id),
        schedule: Schedule::from_persisted(
            row.applications_start,
            row.applications_deadline,
            row.work_start,
            row.work_deadline,
        ),
        status,
        acceptance_requested: row.acceptance_requested,
        acceptance_confirmed: row.acceptance_confirmed,
        created_at: row.created_at,
        updated_at: row.updated_at,
        revision: from_revision_column(row.revision)?,
    }))
}

fn to_application_row(application: &Application) -> ProjectRepositoryResult<ApplicationRow> {
    Ok(ApplicationRow {
        id: application.id().into_inner(),
        project_id: application.project_id().into_inner(),
        freelancer_id: application.freelancer_id().into_inner(),
        status: application.status().as_str().to_owned(),
        created_at: application.created_at(),
        revision: to_revision_column(application.revision())?,
    })
}

fn row_to_application(row: ApplicationRow) -> ProjectRepositoryResult<Application> {
    let status = ApplicationStatus::try_from(row.status.as_str())
        .map_err(ProjectRepositoryError::persistence)?;
    Ok(Application::from_persisted(PersistedApplicationData {
        id: ApplicationId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        freelancer_id: UserId::from_uuid(row.freelancer_id),
        status,
        created_at: row.created_at,
        revision: from_revision_column(row.revision)?,
    }))
}
