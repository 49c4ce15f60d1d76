//! Diesel schema for project lifecycle persistence.

diesel::table! {
    /// Projects posted by employers.
    projects (id) {
        /// Project identifier.
        id -> Uuid,
        /// Owning employer.
        employer_id -> Uuid,
        /// Project title.
        #[max_length = 255]
        title -> Varchar,
        /// Free-form description.
        description -> Text,
        /// Budget in minor currency units.
        budget_minor_units -> Int8,
        /// Optional category.
        category_id -> Nullable<Uuid>,
        /// Payment reference issued by the payments system.
        #[max_length = 255]
        payment_reference -> Nullable<Varchar>,
        /// Freelancer assigned once work starts.
        assigned_freelancer_id -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Optimistic concurrency revision.
        revision -> Int8,
    }
}

diesel::table! {
    /// Lifecycle records, one per project.
    project_lifecycles (project_id) {
        /// Owning project.
        project_id -> Uuid,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Start of the application window.
        applications_start -> Timestamptz,
        /// End of the application window.
        applications_deadline -> Timestamptz,
        /// Start of the work window.
        work_start -> Timestamptz,
        /// End of the work window.
        work_deadline -> Timestamptz,
        /// Freelancer asked for acceptance.
        acceptance_requested -> Bool,
        /// Employer confirmed acceptance.
        acceptance_confirmed -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Time of the latest transition.
        updated_at -> Nullable<Timestamptz>,
        /// Optimistic concurrency revision; versions the whole project.
        revision -> Int8,
    }
}

diesel::table! {
    /// Freelancer applications.
    project_applications (id) {
        /// Application identifier.
        id -> Uuid,
        /// Target project.
        project_id -> Uuid,
        /// Applying freelancer.
        freelancer_id -> Uuid,
        /// Application status.
        #[max_length = 50]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Optimistic concurrency revision.
        revision -> Int8,
    }
}

diesel::table! {
    /// Payment cancellation notices awaiting relay to the payments broker.
    payment_cancellation_outbox (id) {
        /// Notice identifier.
        id -> Uuid,
        /// Payment reference to cancel.
        #[max_length = 255]
        payment_reference -> Varchar,
        /// Message body delivered to the broker.
        payload -> Jsonb,
        /// Enqueue timestamp.
        created_at -> Timestamptz,
        /// Relay timestamp, null until published.
        published_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Named leases used for run-level mutual exclusion.
    reconciliation_leases (name) {
        /// Lease name.
        #[max_length = 100]
        name -> Varchar,
        /// Current holder.
        #[max_length = 255]
        holder -> Varchar,
        /// Expiry of the current holding.
        expires_at -> Timestamptz,
    }
}
