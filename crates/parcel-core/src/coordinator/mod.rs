//! Polling coordinator
//!
//! The ShipmentCoordinator is responsible for:
//! - Refreshing the dataset at startup, on a timer, and on demand
//! - Keeping refreshes sequential (never two fetches in flight)
//! - Retaining the previous dataset when a fetch fails
//! - Publishing whole snapshots to any number of readers
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   timer tick    ┌─────────────────────┐
//! │   interval   │───────────────▶ │                     │
//! └──────────────┘                 │ ShipmentCoordinator │──── fetch ───▶ ShipmentSource
//! ┌──────────────┐ manual request  │                     │
//! │ RefreshHandle│───────────────▶ │                     │
//! └──────────────┘                 └─────────────────────┘
//!                                      │            │
//!                          watch<Arc<Snapshot>>   CoordinatorEvent
//!                                      ▼            ▼
//!                                  SensorSet     monitoring
//! ```
//!
//! ## Failure Semantics
//!
//! Fetch errors and timeouts are never returned to the caller. They are
//! logged, the previous dataset is kept, and the snapshot is marked as
//! not successful so entities report themselves unavailable. The next
//! scheduled tick tries again.

use crate::config::CoordinatorConfig;
use crate::error::{Error, Result};
use crate::model::Dataset;
use crate::traits::ShipmentSource;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::Stream;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

/// Capacity of the manual refresh request queue
const REQUEST_QUEUE_CAPACITY: usize = 8;

/// The coordinator's published view of the world
///
/// Snapshots are immutable; every refresh publishes a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Last successfully fetched dataset (empty before the first success)
    pub dataset: Arc<Dataset>,
    /// Whether the most recent refresh succeeded
    pub last_update_success: bool,
    /// When the dataset was last replaced
    pub last_success_at: Option<DateTime<Utc>>,
    /// When a fetch was last attempted
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Error from the most recent refresh, if it failed
    pub last_error: Option<String>,
    /// Incremented on every publish
    pub generation: u64,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            dataset: Arc::new(Dataset::new()),
            last_update_success: false,
            last_success_at: None,
            last_attempt_at: None,
            last_error: None,
            generation: 0,
        }
    }

    /// Whether any refresh has completed yet
    pub fn is_initialized(&self) -> bool {
        self.last_attempt_at.is_some()
    }
}

/// What caused a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// First refresh when the coordinator starts
    Startup,
    /// Timer tick, subject to throttling
    Scheduled,
    /// Out-of-band request
    Manual,
}

/// Result of a single refresh call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Dataset replaced
    Updated {
        /// Number of distinct shipments in the new dataset
        shipments: usize,
    },
    /// Fetch failed; previous dataset retained
    Failed {
        error: String,
    },
    /// Scheduled refresh skipped because the last attempt was too recent
    Throttled,
}

/// Events emitted by the ShipmentCoordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Run loop started
    Started {
        scan_interval_secs: u64,
    },

    /// Fetch about to be issued
    RefreshStarted {
        trigger: RefreshTrigger,
    },

    /// Dataset replaced
    RefreshSucceeded {
        shipments: usize,
    },

    /// Fetch failed; dataset retained
    RefreshFailed {
        error: String,
    },

    /// Scheduled refresh skipped by the throttle
    RefreshThrottled,

    /// Run loop stopped
    Stopped {
        reason: String,
    },
}

/// Cloneable handle for requesting out-of-band refreshes
///
/// Requests are queued to the running coordinator, so they never overlap
/// with a scheduled refresh.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<oneshot::Sender<RefreshOutcome>>,
}

impl RefreshHandle {
    /// Request a refresh and wait for its outcome
    ///
    /// # Returns
    ///
    /// - `Ok(RefreshOutcome)`: The refresh ran (it may still have failed upstream)
    /// - `Err(Error)`: The coordinator is no longer running
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(reply_tx)
            .await
            .map_err(|_| Error::Other("Coordinator is not running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Other("Coordinator stopped before refreshing".to_string()))
    }

    /// Request a refresh without waiting for it
    ///
    /// Returns `false` if the request queue is full or the coordinator is gone.
    pub fn trigger(&self) -> bool {
        let (reply_tx, _reply_rx) = oneshot::channel();
        self.tx.try_send(reply_tx).is_ok()
    }
}

/// Polling coordinator for one account
///
/// The coordinator is the single writer of the dataset. Readers subscribe
/// to whole snapshots, so no reader ever sees a half-applied refresh.
///
/// ## Lifecycle
///
/// 1. Create with [`ShipmentCoordinator::new()`]
/// 2. Subscribe readers with [`ShipmentCoordinator::subscribe()`]
/// 3. Start with [`ShipmentCoordinator::run()`]
/// 4. Request extra refreshes through a [`RefreshHandle`]
pub struct ShipmentCoordinator {
    /// Upstream source
    source: Arc<dyn ShipmentSource>,

    /// Interval between scheduled refreshes
    scan_interval: Duration,

    /// Throttle window for scheduled refreshes
    min_refresh_interval: Duration,

    /// Upper bound on one fetch
    fetch_timeout: Duration,

    /// Latest snapshot
    snapshot_tx: watch::Sender<Arc<Snapshot>>,

    /// Held for the whole refresh; stores the instant of the last attempt
    refresh_guard: Mutex<Option<Instant>>,

    /// Manual refresh requests
    request_tx: mpsc::Sender<oneshot::Sender<RefreshOutcome>>,
    request_rx: Mutex<Option<mpsc::Receiver<oneshot::Sender<RefreshOutcome>>>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<CoordinatorEvent>,
}

impl ShipmentCoordinator {
    /// Create a new coordinator
    ///
    /// # Returns
    ///
    /// A tuple of (coordinator, event_receiver) where event_receiver yields coordinator events
    pub fn new(
        source: Arc<dyn ShipmentSource>,
        config: &CoordinatorConfig,
    ) -> Result<(Self, mpsc::Receiver<CoordinatorEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::initial()));

        let coordinator = Self {
            source,
            scan_interval: config.scan_interval(),
            min_refresh_interval: config.min_refresh_interval(),
            fetch_timeout: config.fetch_timeout(),
            snapshot_tx,
            refresh_guard: Mutex::new(None),
            request_tx,
            request_rx: Mutex::new(Some(request_rx)),
            event_tx,
        };

        Ok((coordinator, event_rx))
    }

    /// Current snapshot (cheap `Arc` clone)
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Stream of snapshots, starting with the current one
    pub fn snapshot_stream(&self) -> Pin<Box<dyn Stream<Item = Arc<Snapshot>> + Send + 'static>> {
        Box::pin(WatchStream::new(self.snapshot_tx.subscribe()))
    }

    /// Handle for out-of-band refresh requests
    pub fn handle(&self) -> RefreshHandle {
        RefreshHandle {
            tx: self.request_tx.clone(),
        }
    }

    /// Refresh now, ignoring the throttle
    ///
    /// Waits for any in-flight refresh to finish first.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_with(RefreshTrigger::Manual).await
    }

    /// Refresh unless the previous attempt was within the throttle window
    pub async fn refresh_scheduled(&self) -> RefreshOutcome {
        self.refresh_with(RefreshTrigger::Scheduled).await
    }

    async fn refresh_with(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let mut last_attempt = self.refresh_guard.lock().await;

        if trigger == RefreshTrigger::Scheduled
            && !self.min_refresh_interval.is_zero()
            && let Some(at) = *last_attempt
            && at.elapsed() < self.min_refresh_interval
        {
            debug!(
                "Skipping scheduled refresh, last attempt {:?} ago (minimum {:?})",
                at.elapsed(),
                self.min_refresh_interval
            );
            self.emit_event(CoordinatorEvent::RefreshThrottled);
            return RefreshOutcome::Throttled;
        }

        *last_attempt = Some(Instant::now());
        self.emit_event(CoordinatorEvent::RefreshStarted { trigger });

        let result = match tokio::time::timeout(self.fetch_timeout, self.source.fetch_shipments())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.fetch_timeout)),
        };

        let now = Utc::now();
        match result {
            Ok(shipments) => {
                let dataset = Dataset::from_shipments(shipments);
                let count = dataset.len();

                self.publish(|previous| Snapshot {
                    dataset: Arc::new(dataset),
                    last_update_success: true,
                    last_success_at: Some(now),
                    last_attempt_at: Some(now),
                    last_error: None,
                    generation: previous.generation + 1,
                });

                debug!("Parcel data refreshed: {} shipments", count);
                self.emit_event(CoordinatorEvent::RefreshSucceeded { shipments: count });
                RefreshOutcome::Updated { shipments: count }
            }
            Err(e) => {
                error!(
                    "Error communicating with {} API: {}",
                    self.source.source_name(),
                    e
                );
                let message = e.to_string();

                self.publish(|previous| Snapshot {
                    dataset: Arc::clone(&previous.dataset),
                    last_update_success: false,
                    last_success_at: previous.last_success_at,
                    last_attempt_at: Some(now),
                    last_error: Some(message.clone()),
                    generation: previous.generation + 1,
                });

                self.emit_event(CoordinatorEvent::RefreshFailed {
                    error: message.clone(),
                });
                RefreshOutcome::Failed { error: message }
            }
        }
    }

    fn publish(&self, next: impl FnOnce(&Snapshot) -> Snapshot) {
        // Stores the snapshot even before anyone subscribes
        self.snapshot_tx.send_modify(|current| {
            let replacement = next(current);
            *current = Arc::new(replacement);
        });
    }

    /// Run the coordinator
    ///
    /// Refreshes once at startup, then on every scan interval tick and on
    /// every manual request, until SIGINT is received.
    ///
    /// A coordinator runs once. After it stops, every [`RefreshHandle`]
    /// request fails immediately.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the coordinator until the given shutdown signal fires
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let mut requests = self
            .request_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| {
                Error::Other("Coordinator is already running or has stopped".to_string())
            })?;

        self.emit_event(CoordinatorEvent::Started {
            scan_interval_secs: self.scan_interval.as_secs(),
        });
        info!(
            "Starting shipment coordinator (source={}, interval={:?})",
            self.source.source_name(),
            self.scan_interval
        );

        self.refresh_with(RefreshTrigger::Startup).await;

        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.scan_interval, self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_with(RefreshTrigger::Scheduled).await;
                }

                Some(reply) = requests.recv() => {
                    let outcome = self.refresh_with(RefreshTrigger::Manual).await;
                    // The requester may have stopped waiting
                    let _ = reply.send(outcome);
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(CoordinatorEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        // A stopped coordinator refuses new requests; dropping queued replies
        // fails their waiters
        requests.close();
        let mut dropped = 0;
        while requests.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Dropped {} pending refresh request(s) at shutdown", dropped);
        }

        info!("Shipment coordinator stopped");
        Ok(())
    }

    fn emit_event(&self, event: CoordinatorEvent) {
        if self.event_tx.try_send(event).is_err() {
            // Full or closed; monitoring must never slow down polling
            warn!("Event channel full, dropping coordinator event");
        }
    }
}
