//! Write sets derived from mutated project snapshots.

use super::{Application, ApplicationId, Lifecycle, Project, ProjectSnapshot};
use std::collections::HashMap;

/// The records one unit of work writes.
///
/// Every record carries the revision it was read at. A store applies the whole
/// set atomically and only when each stored revision still matches. The
/// lifecycle revision doubles as the version of the whole project: any change
/// to a project's records also writes its lifecycle, so two writers touching
/// different applications of the same project still conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectChangeSet {
    projects: Vec<Project>,
    lifecycles: Vec<Lifecycle>,
    inserted_applications: Vec<Application>,
    updated_applications: Vec<Application>,
    deleted_applications: Vec<Application>,
}

impl ProjectChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the change set that turns `before` into `after`.
    #[must_use]
    pub fn between(before: &ProjectSnapshot, after: &ProjectSnapshot) -> Self {
        let mut changes = Self::new();
        changes.record(before, after);
        changes
    }

    /// Adds the writes that turn `before` into `after`.
    pub fn record(&mut self, before: &ProjectSnapshot, after: &ProjectSnapshot) {
        let writes_before = self.write_count();
        if before.project() != after.project() {
            self.projects.push(after.project().clone());
        }

        let previous: HashMap<ApplicationId, &Application> = before
            .applications()
            .iter()
            .map(|application| (application.id(), application))
            .collect();

        for application in after.applications() {
            match previous.get(&application.id()) {
                None => self.inserted_applications.push(application.clone()),
                Some(old) if *old != application => {
                    self.updated_applications.push(application.clone());
                }
                Some(_) => {}
            }
        }

        for application in before.applications() {
            if after.application(application.id()).is_none() {
                self.deleted_applications.push(application.clone());
            }
        }

        if before.lifecycle() != after.lifecycle() || self.write_count() > writes_before {
            self.lifecycles.push(after.lifecycle().clone());
        }
    }

    /// Moves every write of `other` into this change set.
    pub fn merge(&mut self, other: Self) {
        self.projects.extend(other.projects);
        self.lifecycles.extend(other.lifecycles);
        self.inserted_applications.extend(other.inserted_applications);
        self.updated_applications.extend(other.updated_applications);
        self.deleted_applications.extend(other.deleted_applications);
    }

    /// Returns `true` when nothing would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }

    /// Returns the number of record writes in the set.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.projects.len()
            + self.lifecycles.len()
            + self.inserted_applications.len()
            + self.updated_applications.len()
            + self.deleted_applications.len()
    }

    /// Projects to update.
    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Lifecycles to update.
    #[must_use]
    pub fn lifecycles(&self) -> &[Lifecycle] {
        &self.lifecycles
    }

    /// Applications to insert.
    #[must_use]
    pub fn inserted_applications(&self) -> &[Application] {
        &self.inserted_applications
    }

    /// Applications to update.
    #[must_use]
    pub fn updated_applications(&self) -> &[Application] {
        &self.updated_applications
    }

    /// Applications to delete.
    #[must_use]
    pub fn deleted_applications(&self) -> &[Application] {
        &self.deleted_applications
    }
}
