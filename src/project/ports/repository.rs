//! Repository port for project, lifecycle and application persistence.

use crate::project::domain::{
    Application, ApplicationId, Lifecycle, Project, ProjectChangeSet, ProjectId, ProjectSnapshot,
    UserId,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for project repository operations.
pub type ProjectRepositoryResult<T> = Result<T, ProjectRepositoryError>;

/// Project persistence contract.
///
/// Reads may be served from a replica; [`ProjectRepository::commit`] is the
/// only write path for existing records and applies a whole change set as one
/// unit of work.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Stores a new project together with its lifecycle and applications.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectRepositoryError::DuplicateProject`] when the project
    /// identifier already exists.
    async fn create(&self, snapshot: &ProjectSnapshot) -> ProjectRepositoryResult<()>;

    /// Loads a project with its lifecycle and applications.
    ///
    /// Returns `None` when the project does not exist.
    async fn find_snapshot(&self, id: ProjectId) -> ProjectRepositoryResult<Option<ProjectSnapshot>>;

    /// Loads every project whose lifecycle status is not terminal, with
    /// lifecycles and applications attached.
    async fn find_open_snapshots(&self) -> ProjectRepositoryResult<Vec<ProjectSnapshot>>;

    /// Finds a project record by identifier.
    async fn find_project(&self, id: ProjectId) -> ProjectRepositoryResult<Option<Project>>;

    /// Finds the lifecycle of a project.
    async fn find_lifecycle(&self, project_id: ProjectId)
    -> ProjectRepositoryResult<Option<Lifecycle>>;

    /// Finds an application by identifier.
    async fn find_application(
        &self,
        id: ApplicationId,
    ) -> ProjectRepositoryResult<Option<Application>>;

    /// Returns the applications of a project in creation order.
    async fn find_applications_by_project(
        &self,
        project_id: ProjectId,
    ) -> ProjectRepositoryResult<Vec<Application>>;

    /// Finds the application a freelancer submitted to a project.
    async fn find_application_by_freelancer(
        &self,
        project_id: ProjectId,
        freelancer_id: UserId,
    ) -> ProjectRepositoryResult<Option<Application>>;

    /// Applies every write of `changes` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectRepositoryError::Conflict`] when any record's stored
    /// revision differs from the revision in the change set,
    /// [`ProjectRepositoryError::NotFound`] when an updated record is absent,
    /// or [`ProjectRepositoryError::DuplicateApplication`] when an inserted
    /// application repeats a (project, freelancer) pair. Nothing is written
    /// when an error is returned.
    async fn commit(&self, changes: &ProjectChangeSet) -> ProjectRepositoryResult<()>;
}

/// Identifies one stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// A project record.
    Project(ProjectId),
    /// The lifecycle of a project.
    Lifecycle(ProjectId),
    /// An application record.
    Application(ApplicationId),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(id) => write!(f, "project {id}"),
            Self::Lifecycle(id) => write!(f, "lifecycle of project {id}"),
            Self::Application(id) => write!(f, "application {id}"),
        }
    }
}

/// Errors returned by project repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ProjectRepositoryError {
    /// A project with the same identifier already exists.
    #[error("duplicate project identifier: {0}")]
    DuplicateProject(ProjectId),

    /// The freelancer already applied to the project.
    #[error("freelancer {freelancer_id} already applied to project {project_id}")]
    DuplicateApplication {
        /// Target project.
        project_id: ProjectId,
        /// Applying freelancer.
        freelancer_id: UserId,
    },

    /// The record was not found.
    #[error("{0} not found")]
    NotFound(RecordKey),

    /// The record changed since it was read.
    #[error("{0} was modified concurrently")]
    Conflict(RecordKey),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProjectRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
