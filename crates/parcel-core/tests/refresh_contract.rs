//! Contract Test: Refresh Semantics
//!
//! Constraints verified:
//! - A successful refresh replaces the dataset exactly
//! - A failed refresh keeps the previous dataset and marks it stale
//! - Fetch errors never propagate to the caller
//! - Entities follow shipments by id across refreshes
//!
//! If this test fails, someone has:
//! - Merged datasets instead of replacing them
//! - Cleared data on a transient failure
//! - Matched entities by list position

mod common;

use common::*;
use parcel_core::traits::ReportsAvailability;
use parcel_core::{RefreshOutcome, SensorSet, Shipment, ShipmentCoordinator, ShipmentId};
use std::sync::Arc;

#[tokio::test]
async fn successful_refresh_replaces_dataset_exactly() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(two_shipments()),
        Ok(vec![Shipment::new(7u64).with_status("pending")]),
    ]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");

    coordinator.refresh().await;
    assert_eq!(coordinator.snapshot().dataset.len(), 2);

    let outcome = coordinator.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Updated { shipments: 1 });

    let snapshot = coordinator.snapshot();
    let ids: Vec<&str> = snapshot.dataset.ids().map(ShipmentId::as_str).collect();
    assert_eq!(ids, vec!["7"], "old shipments must not survive a successful refresh");
    assert!(snapshot.last_update_success);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_dataset() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(two_shipments()),
        Err(server_error()),
    ]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");

    coordinator.refresh().await;
    let before = coordinator.snapshot();

    let outcome = coordinator.refresh().await;
    assert!(
        matches!(outcome, RefreshOutcome::Failed { ref error } if error.contains("500")),
        "server error is reported as an outcome, got {:?}",
        outcome
    );

    let after = coordinator.snapshot();
    assert_eq!(after.dataset, before.dataset, "dataset must be retained on failure");
    assert!(!after.last_update_success);
    assert_eq!(after.last_success_at, before.last_success_at);
    assert!(after.generation > before.generation);
}

#[tokio::test]
async fn failure_before_first_success_leaves_empty_dataset() {
    let source = Arc::new(ScriptedSource::new(vec![Err(server_error())]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");

    coordinator.refresh().await;

    let snapshot = coordinator.snapshot();
    assert!(snapshot.is_initialized());
    assert!(snapshot.dataset.is_empty());
    assert!(!snapshot.last_update_success);
    assert!(snapshot.last_success_at.is_none());
}

#[tokio::test]
async fn sensors_go_unavailable_and_recover() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(two_shipments()),
        Err(server_error()),
        Ok(two_shipments()),
    ]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");
    let mut sensors = SensorSet::new("Parcel");

    coordinator.refresh().await;
    sensors.apply(&coordinator.snapshot());
    assert!(sensors.iter().all(|s| s.available()));

    coordinator.refresh().await;
    sensors.apply(&coordinator.snapshot());
    assert_eq!(sensors.len(), 2, "entities survive a failed refresh");
    assert!(sensors.iter().all(|s| !s.available()));

    coordinator.refresh().await;
    sensors.apply(&coordinator.snapshot());
    assert!(sensors.iter().all(|s| s.available()));
}

#[tokio::test]
async fn delivered_shipment_removed_upstream_loses_its_entity() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(two_shipments()),
        Ok(vec![two_shipments().remove(0)]),
    ]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");
    let mut sensors = SensorSet::new("Parcel");

    coordinator.refresh().await;
    sensors.apply(&coordinator.snapshot());
    assert!(sensors.get(&ShipmentId::from(42u64)).is_some());

    coordinator.refresh().await;
    let report = sensors.apply(&coordinator.snapshot());

    assert_eq!(report.removed, vec![ShipmentId::from(42u64)]);
    assert!(sensors.get(&ShipmentId::from(42u64)).is_none());
    let remaining: Vec<String> = sensors.render().into_iter().map(|v| v.name).collect();
    assert_eq!(remaining, vec!["Parcel DHL JD014600".to_string()]);
}

#[tokio::test]
async fn repeated_id_keeps_later_record() {
    let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
        Shipment::new(5u64).with_status("pending"),
        Shipment::new("5").with_status("delivered"),
    ])]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");

    let outcome = coordinator.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Updated { shipments: 1 });

    let snapshot = coordinator.snapshot();
    let shipment = snapshot.dataset.get(&ShipmentId::from(5u64)).expect("shipment 5 present");
    assert_eq!(shipment.status.as_deref(), Some("delivered"));
}

#[tokio::test]
async fn subscribers_see_whole_snapshots() {
    let source = Arc::new(ScriptedSource::new(vec![Ok(two_shipments())]));
    let (coordinator, _events) =
        ShipmentCoordinator::new(source, &unthrottled_config()).expect("coordinator construction succeeds");
    let mut rx = coordinator.subscribe();

    assert!(!rx.borrow().is_initialized());

    coordinator.refresh().await;
    rx.changed().await.expect("coordinator still alive");

    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.dataset.len(), 2);
    assert!(snapshot.last_update_success);
    assert_eq!(snapshot.generation, 1);
}
