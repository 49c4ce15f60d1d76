//! Transition rule table for the lifecycle reconciliation pass.
//!
//! The rules form an ordered, first-match-wins list. Order is part of the
//! contract: a project past its work deadline is `Expired` even if an
//! application is accepted, because the expiry rule sits above the
//! work-start rule. Evaluation is pure and performs no I/O; the caller supplies
//! the current time.

use super::{ProjectStatus, Schedule};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Number of days an `Expired` project waits before it is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GracePeriod(u32);

impl GracePeriod {
    /// Creates a grace period of `days` days.
    #[must_use]
    pub const fn from_days(days: u32) -> Self {
        Self(days)
    }

    /// Returns the number of days.
    #[must_use]
    pub const fn days(self) -> u32 {
        self.0
    }

    /// Returns the grace period as a time delta.
    #[must_use]
    pub fn as_time_delta(self) -> TimeDelta {
        TimeDelta::days(i64::from(self.0))
    }
}

/// Mutation a decision requires beyond the status change itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// Nothing beyond the status.
    None,
    /// Assign the accepted applicant to the project and reject every other
    /// non-accepted application.
    ReassignFreelancerAndRejectOthers,
}

/// Everything the evaluator may look at for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionFacts {
    /// Current lifecycle status.
    pub status: ProjectStatus,
    /// Lifecycle creation time; stands in for `updated_at` before the first
    /// transition.
    pub created_at: DateTime<Utc>,
    /// Time of the latest transition.
    pub updated_at: Option<DateTime<Utc>>,
    /// Scheduling boundaries.
    pub schedule: Schedule,
    /// Whether the employer confirmed acceptance.
    pub acceptance_confirmed: bool,
    /// Whether any application of the project is accepted.
    pub has_accepted_application: bool,
    /// Whether the project has an assigned freelancer.
    pub has_assigned_freelancer: bool,
    /// Evaluation time.
    pub now: DateTime<Utc>,
    /// Configured grace period for expired projects.
    pub grace_period: GracePeriod,
}

impl TransitionFacts {
    fn past_work_deadline(&self) -> bool {
        self.now > self.schedule.work_deadline()
    }

    fn past_work_start(&self) -> bool {
        self.now > self.schedule.work_start()
    }

    fn grace_period_elapsed(&self) -> bool {
        let last_transition = self.updated_at.unwrap_or(self.created_at);
        last_transition
            .checked_add_signed(self.grace_period.as_time_delta())
            .is_some_and(|grace_end| grace_end < self.now)
    }
}

/// One entry of the ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    /// Stable rule name used in logs.
    pub name: &'static str,
    /// Predicate selecting this rule.
    pub applies: fn(&TransitionFacts) -> bool,
    /// Status the project moves to.
    pub next_status: ProjectStatus,
    /// Additional mutation required.
    pub side_effect: SideEffect,
}

/// The ordered rule table. The first rule whose predicate holds wins.
pub const TRANSITION_RULES: [TransitionRule; 7] = [
    TransitionRule {
        name: "acceptance_confirmed",
        applies: |facts| facts.acceptance_confirmed,
        next_status: ProjectStatus::Completed,
        side_effect: SideEffect::None,
    },
    TransitionRule {
        name: "expired_grace_elapsed",
        applies: |facts| {
            facts.past_work_deadline()
                && facts.status == ProjectStatus::Expired
                && facts.grace_period_elapsed()
        },
        next_status: ProjectStatus::Cancelled,
        side_effect: SideEffect::None,
    },
    TransitionRule {
        name: "work_deadline_passed",
        applies: |facts| {
            facts.past_work_deadline() && facts.status != ProjectStatus::PendingForReview
        },
        next_status: ProjectStatus::Expired,
        side_effect: SideEffect::None,
    },
    TransitionRule {
        name: "work_started_with_accepted_application",
        applies: |facts| facts.past_work_start() && facts.has_accepted_application,
        next_status: ProjectStatus::InProgress,
        side_effect: SideEffect::ReassignFreelancerAndRejectOthers,
    },
    TransitionRule {
        name: "work_started_without_freelancer",
        applies: |facts| facts.past_work_start() && !facts.has_assigned_freelancer,
        next_status: ProjectStatus::Cancelled,
        side_effect: SideEffect::None,
    },
    TransitionRule {
        name: "applications_closed",
        applies: |facts| facts.now > facts.schedule.applications_deadline(),
        next_status: ProjectStatus::WaitingForWorkStart,
        side_effect: SideEffect::None,
    },
    TransitionRule {
        name: "applications_opened",
        applies: |facts| facts.now > facts.schedule.applications_start(),
        next_status: ProjectStatus::AcceptingApplications,
        side_effect: SideEffect::None,
    },
];

/// Outcome of evaluating one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Name of the matched rule, or `None` when no rule applied.
    pub rule: Option<&'static str>,
    /// Status the project should hold after this pass.
    pub next_status: ProjectStatus,
    /// Additional mutation required.
    pub side_effect: SideEffect,
}

impl Decision {
    const fn unchanged(status: ProjectStatus) -> Self {
        Self {
            rule: None,
            next_status: status,
            side_effect: SideEffect::None,
        }
    }

    /// Returns `true` when the decision moves the project off `current`.
    #[must_use]
    pub fn changes_status(&self, current: ProjectStatus) -> bool {
        self.next_status != current
    }
}

/// Returns the first rule of [`TRANSITION_RULES`] that applies to `facts`.
#[must_use]
pub fn matching_rule(facts: &TransitionFacts) -> Option<&'static TransitionRule> {
    TRANSITION_RULES.iter().find(|rule| (rule.applies)(facts))
}

/// Evaluates the rule table for one project.
///
/// Terminal statuses are fixed points: no rule is consulted for them.
#[must_use]
pub fn evaluate(facts: &TransitionFacts) -> Decision {
    if facts.status.is_terminal() {
        return Decision::unchanged(facts.status);
    }

    matching_rule(facts).map_or_else(
        || Decision::unchanged(facts.status),
        |rule| Decision {
            rule: Some(rule.name),
            next_status: rule.next_status,
            side_effect: rule.side_effect,
        },
    )
}
