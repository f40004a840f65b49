//! Test doubles and common utilities for coordinator contract tests
//!
//! These sources never touch the network. Each one records enough about
//! how it was called for the tests to check the coordinator's guarantees.

#![allow(dead_code)]

use parcel_core::error::{Error, Result};
use parcel_core::{CoordinatorConfig, Shipment, ShipmentSource};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A source that replays a queue of scripted results
///
/// Once the script is exhausted every call fails.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Shipment>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<Shipment>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, usable after the source moves into a coordinator
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ShipmentSource for ScriptedSource {
    async fn fetch_shipments(&self) -> Result<Vec<Shipment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::http("script exhausted")))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A source that always returns the same shipments
pub struct StaticSource {
    shipments: Vec<Shipment>,
    calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(shipments: Vec<Shipment>) -> Self {
        Self {
            shipments,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ShipmentSource for StaticSource {
    async fn fetch_shipments(&self) -> Result<Vec<Shipment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.shipments.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// A source that sleeps before answering and tracks overlapping calls
pub struct SlowSource {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl SlowSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Highest number of fetches observed running at the same time
    pub fn max_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_in_flight)
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ShipmentSource for SlowSource {
    async fn fetch_shipments(&self) -> Result<Vec<Shipment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![Shipment::new(1u64).with_status("in_transit")])
    }

    fn source_name(&self) -> &'static str {
        "slow"
    }
}

/// Simulates the API answering with a server error
pub fn server_error() -> Error {
    Error::http("HTTP 500 Internal Server Error: upstream unavailable")
}

/// Coordinator settings with throttling disabled
pub fn unthrottled_config() -> CoordinatorConfig {
    CoordinatorConfig {
        min_refresh_interval_secs: 0,
        ..CoordinatorConfig::default()
    }
}

/// Two shipments, ids 1 and 42
pub fn two_shipments() -> Vec<Shipment> {
    vec![
        Shipment::new(1u64)
            .with_status("in_transit")
            .with_carrier("DHL")
            .with_tracking_number("JD014600"),
        Shipment::new(42u64)
            .with_status("delivered")
            .with_carrier("UPS")
            .with_tracking_number("1Z999"),
    ]
}
