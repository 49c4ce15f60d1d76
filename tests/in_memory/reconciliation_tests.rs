//! Time-driven transition tests over the in-memory adapters.

use super::helpers::{Marketplace, day, marketplace};
use hireloop::project::domain::{ProjectStatus, UserId};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn project_without_freelancer_is_cancelled_at_work_start(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let employer = UserId::new();
    let project_id = marketplace.post_project(employer).await?.id();
    marketplace
        .service
        .record_payment_reference(project_id, "pi_unstaffed")
        .await?;

    marketplace.reconcile_at(day(2)).await?;
    marketplace.service.apply(project_id, UserId::new()).await?;
    let report = marketplace.reconcile_at(day(13)).await?;

    assert_eq!(report.transitions, 1);
    assert_eq!(marketplace.status(project_id).await?, ProjectStatus::Cancelled);
    assert!(marketplace.payments.emitted().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn late_first_pass_jumps_straight_to_the_current_rule(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let project_id = marketplace.post_project(UserId::new()).await?.id();

    let report = marketplace.reconcile_at(day(11)).await?;

    assert_eq!(report.transitions, 1);
    assert_eq!(
        marketplace.status(project_id).await?,
        ProjectStatus::WaitingForWorkStart
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_passes_are_idempotent(marketplace: Marketplace) -> eyre::Result<()> {
    for _ in 0..3 {
        marketplace.post_project(UserId::new()).await?;
    }

    let first = marketplace.reconcile_at(day(2)).await?;
    let second = marketplace.reconcile_at(day(3)).await?;

    assert_eq!(first.transitions, 3);
    assert_eq!(first.writes, 3);
    assert_eq!(second.loaded, 3);
    assert_eq!(second.transitions, 0);
    assert_eq!(second.writes, 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_project_is_cancelled_only_after_grace(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let employer = UserId::new();
    let freelancer = UserId::new();
    let project_id = marketplace.post_project(employer).await?.id();
    marketplace.reconcile_at(day(2)).await?;
    let application = marketplace.service.apply(project_id, freelancer).await?;
    marketplace
        .service
        .accept_application(project_id, application.id(), employer)
        .await?;
    marketplace.reconcile_at(day(13)).await?;

    marketplace.reconcile_at(day(31)).await?;
    marketplace.reconcile_at(day(38)).await?;
    assert_eq!(marketplace.status(project_id).await?, ProjectStatus::Expired);

    marketplace.reconcile_at(day(39)).await?;
    assert_eq!(marketplace.status(project_id).await?, ProjectStatus::Cancelled);
    Ok(())
}
