use crate::modules::pledges::adapters::outbound::in_memory::InMemoryPledgeRepository;
use crate::modules::pledges::core::changes::PledgeChange;
use crate::modules::pledges::core::errors::{SubmitError, ValidationError};
use crate::modules::pledges::core::ports::{PledgeOrder, PledgeRepository};
use crate::modules::pledges::core::stats::Stats;
use crate::modules::pledges::use_cases::submit_pledge::command::SubmitPledge;
use crate::modules::pledges::use_cases::submit_pledge::controller::SubmissionState;
use crate::shell::config::AppConfig;
use crate::shell::state::AppState;
use crate::tests::fixtures::pledges::PledgeBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn app_for(repository: Arc<InMemoryPledgeRepository>, pairs: &[(&str, &str)]) -> AppState {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    AppState::with_repository(repository, &config)
}

fn two_pledges() -> Arc<InMemoryPledgeRepository> {
    Arc::new(InMemoryPledgeRepository::with_pledges(vec![
        PledgeBuilder::new()
            .id("1")
            .name("A")
            .monthly_amount(10.0)
            .created_at(1_000)
            .build(),
        PledgeBuilder::new()
            .id("2")
            .name("B")
            .monthly_amount(20.0)
            .created_at(2_000)
            .build(),
    ]))
}

async fn wait_for_count(app: &AppState, count: usize) {
    let mut view = app.pledges.watch();
    tokio::time::timeout(
        Duration::from_secs(1),
        view.wait_for(|v| v.stats.count == count),
    )
    .await
    .expect("store did not settle in time")
    .unwrap();
}

#[tokio::test]
async fn submits_then_follows_a_remote_delete() {
    let repository = two_pledges();
    let mut app = app_for(repository.clone(), &[("PLEDGES_ORDERING", "insertion")]);
    app.start().await;

    assert_eq!(
        app.pledges.stats().await,
        Stats {
            count: 2,
            total_monthly: 30.0,
            average_monthly: 15.0,
            projected_annual: 360.0,
        }
    );

    let charlie = app
        .submissions
        .submit(SubmitPledge::new("Charlie", "15"))
        .await
        .unwrap();

    assert_eq!(repository.insert_calls(), 1);
    assert_eq!(app.pledges.snapshot().await.len(), 3);
    assert_eq!(app.pledges.stats().await.total_monthly, 45.0);

    repository.delete_pledge("2").await;
    wait_for_count(&app, 2).await;

    let ids: Vec<String> = app
        .pledges
        .snapshot()
        .await
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec!["1".to_string(), charlie.id]);

    app.shutdown();
}

#[tokio::test]
async fn evicts_the_oldest_pledge_past_the_cap() {
    let repository = Arc::new(InMemoryPledgeRepository::with_pledges(
        (0..50)
            .map(|i| {
                PledgeBuilder::new()
                    .id(format!("p-{i}"))
                    .created_at(1_000 + i)
                    .build()
            })
            .collect(),
    ));
    let mut app = app_for(repository.clone(), &[]);
    app.start().await;
    assert_eq!(app.pledges.snapshot().await.len(), 50);

    repository
        .insert_external(PledgeBuilder::new().id("p-50").created_at(5_000).build())
        .await;
    tokio::time::timeout(Duration::from_secs(1), async {
        while app.pledges.applied_changes() < 1 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("insert was not delivered in time");

    let snapshot = app.pledges.snapshot().await;
    assert_eq!(snapshot.len(), 50);
    assert_eq!(snapshot[0].id, "p-50");
    assert!(snapshot.iter().all(|p| p.id != "p-0"));

    wait_for_stats(&app, 51).await;
    assert_eq!(app.stats.current().stats.count, 51);
}

async fn wait_for_stats(app: &AppState, count: usize) {
    let mut view = app.stats.watch();
    tokio::time::timeout(
        Duration::from_secs(1),
        view.wait_for(|v| v.stats.count == count),
    )
    .await
    .expect("stats did not settle in time")
    .unwrap();
}

#[tokio::test]
async fn applies_a_repeated_insert_once() {
    let repository = two_pledges();
    let mut app = app_for(repository, &[]);
    app.start().await;
    let charlie = PledgeBuilder::new()
        .id("3")
        .name("Charlie")
        .created_at(3_000)
        .build();

    assert!(app.pledges.apply(PledgeChange::Inserted(charlie.clone())).await);
    assert!(!app.pledges.apply(PledgeChange::Inserted(charlie)).await);

    let snapshot = app.pledges.snapshot().await;
    assert_eq!(snapshot.iter().filter(|p| p.id == "3").count(), 1);
    assert_eq!(snapshot.len(), 3);
}

#[tokio::test]
async fn issues_one_write_for_overlapping_submits() {
    let repository = two_pledges();
    repository.set_delay_insert_ms(20);
    let mut app = app_for(repository.clone(), &[("PLEDGES_ONE_PER_SESSION", "false")]);
    app.start().await;
    let submissions = app.submissions.clone();

    let first = tokio::spawn({
        let submissions = submissions.clone();
        async move { submissions.submit(SubmitPledge::new("Alice", "12")).await }
    });
    tokio::time::timeout(Duration::from_secs(1), async {
        while submissions.state() != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("first submission never started");

    let second = submissions.submit(SubmitPledge::new("Bob", "9")).await;

    assert_eq!(
        second,
        Err(SubmitError::Validation(ValidationError::SubmissionPending))
    );
    assert!(first.await.unwrap().is_ok());
    assert_eq!(repository.insert_calls(), 1);
}

#[tokio::test]
async fn rejects_invalid_input_without_writing() {
    let repository = two_pledges();
    let mut app = app_for(repository.clone(), &[]);
    app.start().await;

    for (name, amount) in [("", "12"), ("Alice", "0"), ("Alice", "-5")] {
        let result = app.submissions.submit(SubmitPledge::new(name, amount)).await;
        assert!(matches!(result, Err(SubmitError::Validation(_))));
        assert_eq!(app.submissions.state(), SubmissionState::Idle);
    }

    assert_eq!(repository.insert_calls(), 0);
    assert_eq!(app.pledges.snapshot().await.len(), 2);
    assert_eq!(
        repository
            .list_pledges(PledgeOrder::InsertionOrder, None)
            .await
            .unwrap()
            .len(),
        2
    );
    assert!(!app.submissions.has_submitted());
}
