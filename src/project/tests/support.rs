//! Fixtures shared by the project unit tests.

use crate::project::domain::{
    Application, ApplicationStatus, Budget, Lifecycle, PersistedApplicationData,
    PersistedLifecycleData, Project, ProjectDetails, ProjectSnapshot, ProjectStatus, Schedule,
    UserId,
};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use std::sync::Mutex;

/// Clock whose current time is set by the test.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = now;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Midnight on the project's creation day.
pub fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
        .single()
        .expect("valid origin timestamp")
}

/// `days` days after [`origin`].
pub fn day(days: i64) -> DateTime<Utc> {
    origin() + TimeDelta::days(days)
}

/// Applications open on day 1, close on day 10; work runs from day 12 to 30.
pub fn schedule() -> Schedule {
    Schedule::new(day(1), day(10), day(12), day(30)).expect("ordered schedule")
}

/// Builds a project owned by `employer` with the standard schedule.
pub fn project(employer: UserId) -> Project {
    let details = ProjectDetails::new(
        "Port the billing service",
        "Move billing to the new ledger",
        Budget::from_minor_units(250_000).expect("valid budget"),
    )
    .expect("valid details");
    Project::new(employer, details, origin())
}

/// Rebuilds `lifecycle` with a new status and transition timestamp.
pub fn with_status(
    lifecycle: &Lifecycle,
    status: ProjectStatus,
    updated_at: Option<DateTime<Utc>>,
) -> Lifecycle {
    Lifecycle::from_persisted(PersistedLifecycleData {
        project_id: lifecycle.project_id(),
        schedule: *lifecycle.schedule(),
        status,
        acceptance_requested: lifecycle.acceptance_requested(),
        acceptance_confirmed: lifecycle.acceptance_confirmed(),
        created_at: lifecycle.created_at(),
        updated_at,
        revision: lifecycle.revision(),
    })
}

/// Builds an application in `status`, created `order` minutes after origin.
pub fn application(
    project: &Project,
    freelancer: UserId,
    status: ApplicationStatus,
    order: i64,
) -> Application {
    let template = Application::new(project.id(), freelancer, origin());
    Application::from_persisted(PersistedApplicationData {
        id: template.id(),
        project_id: project.id(),
        freelancer_id: freelancer,
        status,
        created_at: origin() + TimeDelta::minutes(order),
        revision: 0,
    })
}

/// Builds a snapshot in `status` with the given application statuses.
pub fn snapshot(status: ProjectStatus, applications: &[ApplicationStatus]) -> ProjectSnapshot {
    let owned = project(UserId::new());
    let created = Lifecycle::new(owned.id(), schedule(), origin());
    let lifecycle = with_status(&created, status, Some(origin()));
    let records = applications
        .iter()
        .zip(0_i64..)
        .map(|(application_status, order)| {
            application(&owned, UserId::new(), *application_status, order)
        })
        .collect();
    ProjectSnapshot::new(owned, lifecycle, records)
}
