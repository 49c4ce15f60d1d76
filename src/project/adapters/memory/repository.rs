//! In-memory project repository.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::project::{
    domain::{
        Application, ApplicationId, Lifecycle, Project, ProjectChangeSet, ProjectId,
        ProjectSnapshot, UserId,
    },
    ports::{ProjectRepository, ProjectRepositoryError, ProjectRepositoryResult, RecordKey},
};

/// Thread-safe in-memory project repository.
///
/// A commit validates the whole change set under the write lock before
/// applying any of it, so a rejected commit leaves the state untouched.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectRepository {
    state: Arc<RwLock<InMemoryProjectState>>,
}

#[derive(Debug, Default)]
struct InMemoryProjectState {
    projects: HashMap<ProjectId, Project>,
    lifecycles: HashMap<ProjectId, Lifecycle>,
    applications: HashMap<ApplicationId, Application>,
}

impl InMemoryProjectRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ProjectRepositoryResult<RwLockReadGuard<'_, InMemoryProjectState>> {
        self.state.read().map_err(|err| {
            ProjectRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> ProjectRepositoryResult<RwLockWriteGuard<'_, InMemoryProjectState>> {
        self.state.write().map_err(|err| {
            ProjectRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

impl InMemoryProjectState {
    fn applications_of(&self, project_id: ProjectId) -> Vec<Application> {
        let mut applications: Vec<Application> = self
            .applications
            .values()
            .filter(|application| application.project_id() == project_id)
            .cloned()
            .collect();
        applications.sort_by_key(|application| (application.created_at(), application.id()));
        applications
    }

    fn snapshot(&self, project_id: ProjectId) -> Option<ProjectSnapshot> {
        let project = self.projects.get(&project_id)?;
        let lifecycle = self.lifecycles.get(&project_id)?;
        Some(ProjectSnapshot::new(
            project.clone(),
            lifecycle.clone(),
            self.applications_of(project_id),
        ))
    }

    fn validate(&self, changes: &ProjectChangeSet) -> ProjectRepositoryResult<()> {
        for project in changes.projects() {
            let key = RecordKey::Project(project.id());
            let stored = self
                .projects
                .get(&project.id())
                .ok_or(ProjectRepositoryError::NotFound(key))?;
            ensure_revision(stored.revision(), project.revision(), key)?;
        }

        for lifecycle in changes.lifecycles() {
            let key = RecordKey::Lifecycle(lifecycle.project_id());
            let stored = self
                .lifecycles
                .get(&lifecycle.project_id())
                .ok_or(ProjectRepositoryError::NotFound(key))?;
            ensure_revision(stored.revision(), lifecycle.revision(), key)?;
        }

        for application in changes
            .updated_applications()
            .iter()
            .chain(changes.deleted_applications())
        {
            let key = RecordKey::Application(application.id());
            let stored = self
                .applications
                .get(&application.id())
                .ok_or(ProjectRepositoryError::NotFound(key))?;
            ensure_revision(stored.revision(), application.revision(), key)?;
        }

        let mut pairs: HashSet<(ProjectId, UserId)> = self
            .applications
            .values()
            .map(|application| (application.project_id(), application.freelancer_id()))
            .collect();
        for application in changes.inserted_applications() {
            if !self.projects.contains_key(&application.project_id()) {
                return Err(ProjectRepositoryError::NotFound(RecordKey::Project(
                    application.project_id(),
                )));
            }
            let pair = (application.project_id(), application.freelancer_id());
            if self.applications.contains_key(&application.id()) || !pairs.insert(pair) {
                return Err(ProjectRepositoryError::DuplicateApplication {
                    project_id: application.project_id(),
                    freelancer_id: application.freelancer_id(),
                });
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: &ProjectChangeSet) {
        for project in changes.projects() {
            let mut stored = project.clone();
            stored.mark_persisted();
            self.projects.insert(stored.id(), stored);
        }
        for lifecycle in changes.lifecycles() {
            let mut stored = lifecycle.clone();
            stored.mark_persisted();
            self.lifecycles.insert(stored.project_id(), stored);
        }
        for application in changes.deleted_applications() {
            self.applications.remove(&application.id());
        }
        for application in changes
            .updated_applications()
            .iter()
            .chain(changes.inserted_applications())
        {
            let mut stored = application.clone();
            stored.mark_persisted();
            self.applications.insert(stored.id(), stored);
        }
    }
}

const fn ensure_revision(stored: u64, expected: u64, key: RecordKey) -> ProjectRepositoryResult<()> {
    if stored == expected {
        Ok(())
    } else {
        Err(ProjectRepositoryError::Conflict(key))
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn create(&self, snapshot: &ProjectSnapshot) -> ProjectRepositoryResult<()> {
        let mut state = self.write()?;
        let project_id = snapshot.id();
        if state.projects.contains_key(&project_id) {
            return Err(ProjectRepositoryError::DuplicateProject(project_id));
        }

        state
            .projects
            .insert(project_id, snapshot.project().clone());
        state
            .lifecycles
            .insert(project_id, snapshot.lifecycle().clone());
        for application in snapshot.applications() {
            state
                .applications
                .insert(application.id(), application.clone());
        }
        Ok(())
    }

    async fn find_snapshot(&self, id: ProjectId) -> ProjectRepositoryResult<Option<ProjectSnapshot>> {
        Ok(self.read()?.snapshot(id))
    }

    async fn find_open_snapshots(&self) -> ProjectRepositoryResult<Vec<ProjectSnapshot>> {
        let state = self.read()?;
        let mut open: Vec<ProjectSnapshot> = state
            .lifecycles
            .values()
            .filter(|lifecycle| !lifecycle.status().is_terminal())
            .filter_map(|lifecycle| state.snapshot(lifecycle.project_id()))
            .collect();
        open.sort_by_key(|snapshot| (snapshot.project().created_at(), snapshot.id()));
        Ok(open)
    }

    async fn find_project(&self, id: ProjectId) -> ProjectRepositoryResult<Option<Project>> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn find_lifecycle(
        &self,
        project_id: ProjectId,
    ) -> ProjectRepositoryResult<Option<Lifecycle>> {
        Ok(self.read()?.lifecycles.get(&project_id).cloned())
    }

    async fn find_application(
        &self,
        id: ApplicationId,
    ) -> ProjectRepositoryResult<Option<Application>> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    async fn find_applications_by_project(
        &self,
        project_id: ProjectId,
    ) -> ProjectRepositoryResult<Vec<Application>> {
        Ok(self.read()?.applications_of(project_id))
    }

    async fn find_application_by_freelancer(
        &self,
        project_id: ProjectId,
        freelancer_id: UserId,
    ) -> ProjectRepositoryResult<Option<Application>> {
        let state = self.read()?;
        Ok(state
            .applications
            .values()
            .find(|application| {
                application.project_id() == project_id && application.freelancer_id() == freelancer_id
            })
            .cloned())
    }

    async fn commit(&self, changes: &ProjectChangeSet) -> ProjectRepositoryResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut state = self.write()?;
        state.validate(changes)?;
        state.apply(changes);
        Ok(())
    }
}
