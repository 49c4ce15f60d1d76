//! Then steps for project lifecycle BDD scenarios.

use super::world::{ProjectLifecycleWorld, run_async};
use hireloop::project::{
    domain::{ApplicationStatus, PaymentReference, ProjectStatus},
    ports::ProjectRepository,
};
use rstest_bdd_macros::then;

#[then(r#"the project status is "{status}""#)]
fn project_status_is(world: &ProjectLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ProjectStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let project_id = world.project_id()?;
    let lifecycle = run_async(world.repository.find_lifecycle(project_id))?
        .ok_or_else(|| eyre::eyre!("missing lifecycle"))?;

    if lifecycle.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            lifecycle.status()
        ));
    }
    Ok(())
}

#[then("applicant {position:usize} is the assigned freelancer")]
fn applicant_is_assigned(
    world: &ProjectLifecycleWorld,
    position: usize,
) -> Result<(), eyre::Report> {
    let expected = world
        .applications
        .get(position.saturating_sub(1))
        .map(hireloop::project::domain::Application::freelancer_id)
        .ok_or_else(|| eyre::eyre!("no application at position {position}"))?;
    let project = run_async(world.repository.find_project(world.project_id()?))?
        .ok_or_else(|| eyre::eyre!("missing project"))?;

    if project.assigned_freelancer_id() != Some(expected) {
        return Err(eyre::eyre!(
            "expected freelancer {expected}, found {:?}",
            project.assigned_freelancer_id()
        ));
    }
    Ok(())
}

#[then("{count:usize} applications are rejected")]
fn applications_are_rejected(
    world: &ProjectLifecycleWorld,
    count: usize,
) -> Result<(), eyre::Report> {
    let applications =
        run_async(world.repository.find_applications_by_project(world.project_id()?))?;
    let rejected = applications
        .iter()
        .filter(|application| application.status() == ApplicationStatus::Rejected)
        .count();

    if rejected != count {
        return Err(eyre::eyre!("expected {count} rejected, found {rejected}"));
    }
    Ok(())
}

#[then("no payment cancellation was emitted")]
fn no_payment_cancellation(world: &ProjectLifecycleWorld) -> Result<(), eyre::Report> {
    let emitted = world.payments.emitted();
    if !emitted.is_empty() {
        return Err(eyre::eyre!("expected no notices, found {emitted:?}"));
    }
    Ok(())
}

#[then(r#"exactly one payment cancellation was emitted for "{reference}""#)]
fn one_payment_cancellation(
    world: &ProjectLifecycleWorld,
    reference: String,
) -> Result<(), eyre::Report> {
    let expected = vec![PaymentReference::new(reference)?];
    let emitted = world.payments.emitted();
    if emitted != expected {
        return Err(eyre::eyre!("expected {expected:?}, found {emitted:?}"));
    }
    Ok(())
}

#[then("the last pass wrote nothing")]
fn last_pass_wrote_nothing(world: &ProjectLifecycleWorld) -> Result<(), eyre::Report> {
    let report = world
        .last_report
        .ok_or_else(|| eyre::eyre!("no reconciliation pass ran"))?;
    if report.writes != 0 || report.transitions != 0 {
        return Err(eyre::eyre!("expected an idempotent pass, got {report:?}"));
    }
    Ok(())
}
