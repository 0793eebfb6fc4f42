//! End-to-end runs of the medal workflow on virtual time.

mod common;

use common::*;
use medal_workflow::constants::{events, steps};
use medal_workflow::{
    Category, EventPublisher, RunOutcome, SensorState, StepState, WorkflowError,
};
use std::time::Duration;

#[tokio::test]
async fn silver_selection_runs_only_the_silver_aggregator() {
    let harness = WorkflowHarnessBuilder::new().selecting("Silver").build();

    let report = harness.runner.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Succeeded);
    assert_eq!(report.branch.map(|b| b.as_str()), Some("calc_Silver"));
    assert_eq!(report.state_of(steps::CALC_SILVER), Some(StepState::Success));
    assert_eq!(report.state_of(steps::CALC_BRONZE), Some(StepState::Skipped));
    assert_eq!(report.state_of(steps::CALC_GOLD), Some(StepState::Skipped));

    let records = harness.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, Category::Silver);
    assert_eq!(records[0].count, 1_050);
    assert!(records[0].count >= 0);
    assert_eq!(report.record.as_ref(), Some(&records[0]));
}

#[tokio::test]
async fn every_category_inserts_exactly_one_record() {
    for category in Category::ALL {
        let harness = WorkflowHarnessBuilder::new()
            .selecting(category.as_str())
            .build();

        let report = harness.runner.run().await.unwrap();

        assert!(report.is_success(), "{category}: {:?}", report.outcome);
        let records = harness.store.records();
        assert_eq!(records.len(), 1, "{category}");
        assert_eq!(records[0].category, category);
    }
}

#[tokio::test]
async fn random_selection_produces_one_record_of_the_selected_category() {
    for seed in 0..20 {
        let harness = WorkflowHarnessBuilder::new().with_seed(seed).build();

        let report = harness.runner.run().await.unwrap();

        let selection: Category = report
            .selection
            .as_deref()
            .expect("selector emitted a value")
            .parse()
            .expect("selector emits a category");
        let records = harness.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, selection);
        assert_eq!(report.branch.map(|b| b.category()), Some(selection));
    }
}

#[tokio::test]
async fn record_inserted_before_the_pause_is_observed_fresh() {
    let harness = WorkflowHarnessBuilder::new().selecting("Gold").build();

    let report = harness.runner.run().await.unwrap();

    assert_eq!(harness.clock.sleeps(), vec![Duration::from_secs(15)]);
    match report.freshness {
        Some(SensorState::Satisfied {
            attempts,
            elapsed,
            observed,
        }) => {
            assert_eq!(attempts, 1);
            assert_eq!(elapsed, Duration::ZERO);
            assert_eq!(observed, epoch());
        }
        other => panic!("expected a satisfied sensor, got {other:?}"),
    }
    assert_eq!(report.finished_at, seconds_after(epoch(), 15));
}

#[tokio::test]
async fn pause_longer_than_the_window_times_out() {
    let harness = WorkflowHarnessBuilder::new()
        .selecting("Bronze")
        .join_pause_seconds(35)
        .build();

    let report = harness.runner.run().await.unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::FreshnessTimedOut {
            attempts: 4,
            waited: Duration::from_secs(30),
            window: Duration::from_secs(30),
        }
    );
    assert_eq!(report.state_of(steps::CALC_BRONZE), Some(StepState::Success));
    assert_eq!(report.state_of(steps::GENERATE_DELAY), Some(StepState::Success));
    assert_eq!(report.state_of(steps::CHECK_CORRECTNESS), Some(StepState::Failed));

    // pause, then three poke intervals before the fourth and last poke
    assert_eq!(
        harness.clock.sleeps(),
        vec![
            Duration::from_secs(35),
            Duration::from_secs(10),
            Duration::from_secs(10),
            Duration::from_secs(10),
        ]
    );
    assert_eq!(report.finished_at, seconds_after(epoch(), 65));

    let err = report.into_result().unwrap_err();
    assert!(err.is_freshness_timeout());
}

#[tokio::test]
async fn unrecognized_selection_skips_every_aggregator() {
    let harness = WorkflowHarnessBuilder::new().selecting("Platinum").build();

    let report = harness.runner.run().await.unwrap();

    assert_eq!(report.selection.as_deref(), Some("Platinum"));
    assert_eq!(report.branch, None);
    for category in Category::ALL {
        assert_eq!(
            report.state_of(category.branch_id().as_str()),
            Some(StepState::Skipped)
        );
    }
    assert_eq!(report.state_of(steps::PICK_MEDAL_TASK), Some(StepState::Success));
    assert_eq!(report.state_of(steps::GENERATE_DELAY), Some(StepState::Success));
    assert_eq!(report.state_of(steps::CHECK_CORRECTNESS), Some(StepState::Failed));
    assert!(harness.store.records().is_empty());
    assert!(matches!(
        report.freshness,
        Some(SensorState::TimedOut { last_seen: None, .. })
    ));
    assert!(matches!(report.outcome, RunOutcome::FreshnessTimedOut { .. }));
}

#[tokio::test]
async fn insert_failure_fails_the_run_without_waiting() {
    let harness = WorkflowHarnessBuilder::new()
        .selecting("Gold")
        .failing_inserts("relation \"athlete_event_results\" does not exist")
        .build();

    let report = harness.runner.run().await.unwrap();

    assert_eq!(report.state_of(steps::CALC_GOLD), Some(StepState::Failed));
    assert_eq!(report.state_of(steps::CALC_SILVER), Some(StepState::Skipped));
    assert_eq!(
        report.state_of(steps::GENERATE_DELAY),
        Some(StepState::UpstreamFailed)
    );
    assert_eq!(
        report.state_of(steps::CHECK_CORRECTNESS),
        Some(StepState::UpstreamFailed)
    );
    assert!(harness.clock.sleeps().is_empty());
    assert!(report.freshness.is_none());

    let failed_step = report.step(steps::CALC_GOLD).unwrap();
    assert!(failed_step
        .error
        .as_deref()
        .is_some_and(|e| e.contains("does not exist")));

    match report.into_result() {
        Err(WorkflowError::StepFailed { step, reason }) => {
            assert_eq!(step, steps::CALC_GOLD);
            assert!(reason.contains("athlete_event_results"));
        }
        other => panic!("expected a step failure, got {other:?}"),
    }
}

#[tokio::test]
async fn stale_record_from_an_earlier_run_does_not_satisfy_the_check() {
    let harness = WorkflowHarnessBuilder::new().selecting("Platinum").build();
    harness
        .store
        .seed_record(Category::Gold, 7, seconds_after(epoch(), -60));

    let report = harness.runner.run().await.unwrap();

    assert!(matches!(
        report.freshness,
        Some(SensorState::TimedOut { last_seen: Some(_), .. })
    ));
}

#[tokio::test]
async fn lifecycle_events_follow_the_run() {
    let publisher = EventPublisher::new(128);
    let mut receiver = publisher.subscribe();
    let harness = WorkflowHarnessBuilder::new()
        .selecting("Silver")
        .with_publisher(publisher)
        .build();

    let report = harness.runner.run().await.unwrap();
    let names: Vec<String> = drain(&mut receiver)
        .into_iter()
        .map(|event| event.name)
        .collect();

    assert_eq!(names.first().map(String::as_str), Some(events::RUN_STARTED));
    assert_eq!(names.last().map(String::as_str), Some(events::RUN_COMPLETED));
    assert!(names.iter().any(|name| name == events::BRANCH_SELECTED));
    assert_eq!(
        names.iter().filter(|name| *name == events::STEP_SKIPPED).count(),
        2
    );
    assert_eq!(
        names.iter().filter(|name| *name == events::FRESHNESS_POKED).count(),
        1
    );
    assert_eq!(
        names.iter().filter(|name| *name == events::STEP_SUCCEEDED).count(),
        report.steps.iter().filter(|s| s.state == StepState::Success).count()
    );
}

#[tokio::test]
async fn failed_run_publishes_run_failed() {
    let publisher = EventPublisher::new(128);
    let mut receiver = publisher.subscribe();
    let harness = WorkflowHarnessBuilder::new()
        .selecting("Platinum")
        .with_publisher(publisher)
        .build();

    harness.runner.run().await.unwrap();
    let published = drain(&mut receiver);

    assert!(published
        .iter()
        .any(|e| e.name == events::NO_BRANCH_SELECTED));
    let last = published.last().unwrap();
    assert_eq!(last.name, events::RUN_FAILED);
    assert_eq!(last.context["outcome"]["outcome"], "freshness_timed_out");
}
