//! Contract Test: Run Loop
//!
//! Constraints verified:
//! - The coordinator refreshes once at startup
//! - Timer ticks trigger scheduled refreshes
//! - RefreshHandle requests are served by the running loop
//! - Shutdown is prompt and clean
//! - A coordinator cannot run twice at once
//! - Requests fail promptly once the run loop has stopped

mod common;

use common::*;
use parcel_core::{CoordinatorConfig, CoordinatorEvent, RefreshOutcome, ShipmentCoordinator};
use parcel_core::coordinator::RefreshTrigger;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        scan_interval_secs: 60,
        min_refresh_interval_secs: 0,
        ..CoordinatorConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn run_loop_refreshes_on_startup_tick_and_request() {
    let source = StaticSource::new(two_shipments());
    let calls = source.call_counter();

    let (coordinator, mut events) =
        ShipmentCoordinator::new(Arc::new(source), &config()).expect("coordinator construction succeeds");
    let coordinator = Arc::new(coordinator);
    let handle = coordinator.handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.run_with_shutdown(Some(shutdown_rx)).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "startup refresh");
    assert!(coordinator.snapshot().last_update_success);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2, "first scheduled tick");

    let outcome = handle.refresh().await.expect("coordinator is running");
    assert_eq!(outcome, RefreshOutcome::Updated { shipments: 2 });
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown_tx.send(()).expect("runner still listening");
    let result = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("coordinator stops within 5 seconds")
        .expect("runner task did not panic");
    assert!(result.is_ok(), "clean shutdown: {:?}", result);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.first(), Some(&CoordinatorEvent::Started { scan_interval_secs: 60 }));
    assert!(seen.contains(&CoordinatorEvent::RefreshStarted {
        trigger: RefreshTrigger::Startup
    }));
    assert!(seen.contains(&CoordinatorEvent::RefreshStarted {
        trigger: RefreshTrigger::Scheduled
    }));
    assert!(seen.contains(&CoordinatorEvent::RefreshStarted {
        trigger: RefreshTrigger::Manual
    }));
    assert!(matches!(seen.last(), Some(CoordinatorEvent::Stopped { .. })));
}

#[tokio::test(start_paused = true)]
async fn run_loop_survives_failures() {
    let source = ScriptedSource::new(vec![Err(server_error()), Ok(two_shipments())]);
    let calls = source.call_counter();

    let (coordinator, _events) =
        ShipmentCoordinator::new(Arc::new(source), &config()).expect("coordinator construction succeeds");
    let coordinator = Arc::new(coordinator);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.run_with_shutdown(Some(shutdown_rx)).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!coordinator.snapshot().last_update_success);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(coordinator.snapshot().last_update_success);
    assert_eq!(coordinator.snapshot().dataset.len(), 2);

    shutdown_tx.send(()).expect("runner still listening");
    let result = runner.await.expect("runner task did not panic");
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn second_run_is_rejected_while_running() {
    let source = StaticSource::new(Vec::new());
    let (coordinator, _events) =
        ShipmentCoordinator::new(Arc::new(source), &config()).expect("coordinator construction succeeds");
    let coordinator = Arc::new(coordinator);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.run_with_shutdown(Some(shutdown_rx)).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (_unused_tx, unused_rx) = tokio::sync::oneshot::channel();
    assert!(coordinator.run_with_shutdown(Some(unused_rx)).await.is_err());

    shutdown_tx.send(()).expect("runner still listening");
    assert!(runner.await.expect("runner task did not panic").is_ok());
}

#[tokio::test]
async fn handle_fails_once_coordinator_is_gone() {
    let source = StaticSource::new(Vec::new());
    let (coordinator, _events) =
        ShipmentCoordinator::new(Arc::new(source), &config()).expect("coordinator construction succeeds");
    let handle = coordinator.handle();

    drop(coordinator);

    assert!(handle.refresh().await.is_err());
    assert!(!handle.trigger());
}

#[tokio::test(start_paused = true)]
async fn handle_fails_after_run_loop_stops() {
    let source = StaticSource::new(two_shipments());
    let calls = source.call_counter();

    let (coordinator, _events) =
        ShipmentCoordinator::new(Arc::new(source), &config()).expect("coordinator construction succeeds");
    let coordinator = Arc::new(coordinator);
    let handle = coordinator.handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let runner = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.run_with_shutdown(Some(shutdown_rx)).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    shutdown_tx.send(()).expect("runner still listening");
    assert!(runner.await.expect("runner task did not panic").is_ok());

    // The coordinator is still alive, but nothing serves the queue any more
    let result = tokio::time::timeout(Duration::from_secs(2), handle.refresh())
        .await
        .expect("refresh must not hang after the run loop stopped");
    assert!(result.is_err());
    assert!(!handle.trigger());

    let (_unused_tx, unused_rx) = tokio::sync::oneshot::channel();
    assert!(coordinator.run_with_shutdown(Some(unused_rx)).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
