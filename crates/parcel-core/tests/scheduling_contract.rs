//! Contract Test: Refresh Scheduling
//!
//! Constraints verified:
//! - Refreshes never overlap, whoever triggers them
//! - Scheduled refreshes respect the minimum interval, manual ones don't
//! - A fetch that outlives the timeout counts as a failure
//!
//! These tests run on paused time, so the long sleeps cost nothing.

mod common;

use common::*;
use parcel_core::{CoordinatorConfig, CoordinatorEvent, RefreshOutcome, ShipmentCoordinator};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_never_overlap() {
    let source = SlowSource::new(Duration::from_secs(3));
    let max_in_flight = source.max_in_flight();
    let calls = source.call_counter();

    let (coordinator, _events) = ShipmentCoordinator::new(Arc::new(source), &unthrottled_config())
        .expect("coordinator construction succeeds");
    let coordinator = Arc::new(coordinator);

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        })
        .collect();

    for task in tasks {
        let outcome = task.await.expect("refresh task completes");
        assert_eq!(outcome, RefreshOutcome::Updated { shipments: 1 });
    }

    assert_eq!(calls.load(Ordering::SeqCst), 4, "every manual request fetches");
    assert_eq!(
        max_in_flight.load(Ordering::SeqCst),
        1,
        "at most one fetch may be in flight"
    );
}

#[tokio::test(start_paused = true)]
async fn scheduled_refresh_is_throttled() {
    let source = StaticSource::new(two_shipments());
    let calls = source.call_counter();
    let config = CoordinatorConfig {
        min_refresh_interval_secs: 60,
        ..CoordinatorConfig::default()
    };

    let (coordinator, mut events) =
        ShipmentCoordinator::new(Arc::new(source), &config).expect("coordinator construction succeeds");

    assert_eq!(
        coordinator.refresh_scheduled().await,
        RefreshOutcome::Updated { shipments: 2 }
    );
    assert_eq!(coordinator.refresh_scheduled().await, RefreshOutcome::Throttled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Manual refreshes ignore the throttle
    assert_eq!(
        coordinator.refresh().await,
        RefreshOutcome::Updated { shipments: 2 }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(
        coordinator.refresh_scheduled().await,
        RefreshOutcome::Updated { shipments: 2 }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let mut throttled = 0;
    while let Ok(event) = events.try_recv() {
        if event == CoordinatorEvent::RefreshThrottled {
            throttled += 1;
        }
    }
    assert_eq!(throttled, 1);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out_as_failure() {
    let source = SlowSource::new(Duration::from_secs(120));
    let config = CoordinatorConfig {
        fetch_timeout_secs: 5,
        ..unthrottled_config()
    };

    let (coordinator, _events) =
        ShipmentCoordinator::new(Arc::new(source), &config).expect("coordinator construction succeeds");

    let outcome = coordinator.refresh().await;
    match outcome {
        RefreshOutcome::Failed { error } => assert!(error.contains("Timed out"), "got: {}", error),
        other => panic!("expected a timeout failure, got {:?}", other),
    }

    let snapshot = coordinator.snapshot();
    assert!(!snapshot.last_update_success);
    assert!(snapshot.dataset.is_empty());
}
