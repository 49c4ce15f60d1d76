//! Diesel row models for project persistence.

use super::schema::{
    payment_cancellation_outbox, project_applications, project_lifecycles, projects,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Row of the `projects` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    /// Project identifier.
    pub id: Uuid,
    /// Owning employer.
    pub employer_id: Uuid,
    /// Project title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Budget in minor currency units.
    pub budget_minor_units: i64,
    /// Optional category.
    pub category_id: Option<Uuid>,
    /// Payment reference, if recorded.
    pub payment_reference: Option<String>,
    /// Assigned freelancer, if any.
    pub assigned_freelancer_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency revision.
    pub revision: i64,
}

/// Row of the `project_lifecycles` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = project_lifecycles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LifecycleRow {
    /// Owning project.
    pub project_id: Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Start of the application window.
    pub applications_start: DateTime<Utc>,
    /// End of the application window.
    pub applications_deadline: DateTime<Utc>,
    /// Start of the work window.
    pub work_start: DateTime<Utc>,
    /// End of the work window.
    pub work_deadline: DateTime<Utc>,
    /// Freelancer asked for acceptance.
    pub acceptance_requested: bool,
    /// Employer confirmed acceptance.
    pub acceptance_confirmed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Time of the latest transition.
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency revision.
    pub revision: i64,
}

/// Row of the `project_applications` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = project_applications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ApplicationRow {
    /// Application identifier.
    pub id: Uuid,
    /// Target project.
    pub project_id: Uuid,
    /// Applying freelancer.
    pub freelancer_id: Uuid,
    /// Application status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency revision.
    pub revision: i64,
}

/// Insert model for payment cancellation notices.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_cancellation_outbox)]
pub struct NewPaymentCancellationRow {
    /// Notice identifier.
    pub id: Uuid,
    /// Payment reference to cancel.
    pub payment_reference: String,
    /// Message body delivered to the broker.
    pub payload: Value,
    /// Enqueue timestamp.
    pub created_at: DateTime<Utc>,
}
