//! Project aggregate: a project with its lifecycle and applications.

use super::{
    Application, ApplicationId, ApplicationStatus, Decision, GracePeriod, Lifecycle,
    PaymentReference, PreconditionViolation, Project, ProjectDomainError, ProjectId,
    ProjectStatus, SideEffect, TransitionFacts, UserId, evaluate,
};
use chrono::{DateTime, Utc};

/// A project loaded together with its lifecycle and applications.
///
/// Workflow operations and the reconciliation pass both mutate a snapshot in
/// memory; persistence derives the writes by diffing against the snapshot as
/// it was read (see [`super::ProjectChangeSet`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSnapshot {
    project: Project,
    lifecycle: Lifecycle,
    applications: Vec<Application>,
}

impl ProjectSnapshot {
    /// Assembles a snapshot. Applications are kept in creation order.
    #[must_use]
    pub fn new(project: Project, lifecycle: Lifecycle, mut applications: Vec<Application>) -> Self {
        applications.sort_by_key(|application| (application.created_at(), application.id()));
        Self {
            project,
            lifecycle,
            applications,
        }
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectId {
        self.project.id()
    }

    /// Returns the project record.
    #[must_use]
    pub const fn project(&self) -> &Project {
        &self.project
    }

    /// Returns the lifecycle record.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Returns the applications in creation order.
    #[must_use]
    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    /// Finds an application by identifier.
    #[must_use]
    pub fn application(&self, id: ApplicationId) -> Option<&Application> {
        self.applications
            .iter()
            .find(|application| application.id() == id)
    }

    /// Finds the application submitted by `freelancer_id`.
    #[must_use]
    pub fn application_by_freelancer(&self, freelancer_id: UserId) -> Option<&Application> {
        self.applications
            .iter()
            .find(|application| application.freelancer_id() == freelancer_id)
    }

    /// Returns the earliest accepted application, if any.
    #[must_use]
    pub fn accepted_application(&self) -> Option<&Application> {
        self.applications.iter().find(|application| application.is_accepted())
    }

    /// Collects the facts the rule table evaluates.
    #[must_use]
    pub fn transition_facts(&self, now: DateTime<Utc>, grace_period: GracePeriod) -> TransitionFacts {
        TransitionFacts {
            status: self.lifecycle.status(),
            created_at: self.lifecycle.created_at(),
            updated_at: self.lifecycle.updated_at(),
            schedule: *self.lifecycle.schedule(),
            acceptance_confirmed: self.lifecycle.acceptance_confirmed(),
            has_accepted_application: self.accepted_application().is_some(),
            has_assigned_freelancer: self.project.assigned_freelancer_id().is_some(),
            now,
            grace_period,
        }
    }

    /// Evaluates the rule table at `now` and applies the decision.
    ///
    /// The lifecycle is stamped only when the status changes. The reassignment
    /// side effect is applied whenever the matched rule requires it; applying
    /// it twice leaves the snapshot unchanged.
    pub fn reconcile(&mut self, now: DateTime<Utc>, grace_period: GracePeriod) -> Decision {
        let decision = evaluate(&self.transition_facts(now, grace_period));
        self.lifecycle.transition_to(decision.next_status, now);
        if decision.side_effect == SideEffect::ReassignFreelancerAndRejectOthers {
            self.reassign_to_accepted_applicant();
        }
        decision
    }

    fn reassign_to_accepted_applicant(&mut self) {
        let Some(winner) = self.accepted_application().map(Application::freelancer_id) else {
            return;
        };
        if self.project.assigned_freelancer_id() != Some(winner) {
            self.project.assign_freelancer(winner);
        }
        for application in &mut self.applications {
            if !application.is_accepted() && application.status() != ApplicationStatus::Rejected {
                application.set_status(ApplicationStatus::Rejected);
            }
        }
    }

    /// Adds a pending application from `freelancer_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::DuplicateApplication`] when the freelancer
    /// already applied.
    pub fn add_application(
        &mut self,
        freelancer_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<ApplicationId, ProjectDomainError> {
        if self.application_by_freelancer(freelancer_id).is_some() {
            return Err(ProjectDomainError::DuplicateApplication {
                project_id: self.id(),
                freelancer_id,
            });
        }
        let application = Application::new(self.id(), freelancer_id, at);
        let application_id = application.id();
        self.applications.push(application);
        Ok(application_id)
    }

    /// Removes a pending application.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::UnknownApplication`] when the application
    /// is absent or [`PreconditionViolation::ApplicationNotPending`] when it is
    /// no longer pending.
    pub fn withdraw_application(&mut self, id: ApplicationId) -> Result<(), ProjectDomainError> {
        let application = self
            .application(id)
            .ok_or(ProjectDomainError::UnknownApplication(id))?;
        if application.status() != ApplicationStatus::Pending {
            return Err(PreconditionViolation::ApplicationNotPending(id).into());
        }
        self.applications.retain(|candidate| candidate.id() != id);
        Ok(())
    }

    /// Accepts an application.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation unless the project is accepting
    /// applications, has no assigned freelancer, and no other application is
    /// accepted. Returns [`ProjectDomainError::UnknownApplication`] when the
    /// application is absent.
    pub fn accept_application(&mut self, id: ApplicationId) -> Result<(), ProjectDomainError> {
        self.lifecycle
            .ensure_status("accept application", &[ProjectStatus::AcceptingApplications])?;
        if self.project.assigned_freelancer_id().is_some() {
            return Err(PreconditionViolation::FreelancerAlreadyAssigned(self.id()).into());
        }
        if let Some(other) = self
            .applications
            .iter()
            .find(|application| application.is_accepted() && application.id() != id)
        {
            return Err(PreconditionViolation::AnotherApplicationAccepted(other.id()).into());
        }

        self.application_mut(id)?
            .set_status(ApplicationStatus::Accepted);
        Ok(())
    }

    /// Reverts an accepted application to pending.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation unless the project is accepting
    /// applications and the application is accepted. Returns
    /// [`ProjectDomainError::UnknownApplication`] when the application is
    /// absent.
    pub fn reject_application(&mut self, id: ApplicationId) -> Result<(), ProjectDomainError> {
        self.lifecycle
            .ensure_status("reject application", &[ProjectStatus::AcceptingApplications])?;
        let application = self.application_mut(id)?;
        if !application.is_accepted() {
            return Err(PreconditionViolation::ApplicationNotAccepted(id).into());
        }
        application.set_status(ApplicationStatus::Pending);
        Ok(())
    }

    /// Records the assigned freelancer's acceptance request.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::request_acceptance`].
    pub fn request_acceptance(&mut self, at: DateTime<Utc>) -> Result<(), ProjectDomainError> {
        self.lifecycle.request_acceptance(at)
    }

    /// Confirms or rejects a pending acceptance request.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::resolve_acceptance`].
    pub fn resolve_acceptance(
        &mut self,
        confirm: bool,
        at: DateTime<Utc>,
    ) -> Result<(), ProjectDomainError> {
        self.lifecycle.resolve_acceptance(confirm, at)
    }

    /// Cancels the project unconditionally.
    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.lifecycle.cancel(at);
    }

    /// Records the payment reference issued by the payments system.
    pub fn record_payment_reference(&mut self, reference: PaymentReference) {
        self.project.record_payment_reference(reference);
    }

    fn application_mut(&mut self, id: ApplicationId) -> Result<&mut Application, ProjectDomainError> {
        self.applications
            .iter_mut()
            .find(|application| application.id() == id)
            .ok_or(ProjectDomainError::UnknownApplication(id))
    }
}
