// # parcel-core
//
// Core library for the parcel tracking poller.
//
// ## Architecture Overview
//
// This library provides everything except the HTTP transport:
// - **ShipmentSource**: Trait for fetching shipments from the tracking API
// - **ShipmentCoordinator**: Owns the polling cycle and the last-known dataset
// - **SensorSet / ShipmentSensor**: Per-shipment presentation entities
// - **SetupFlow**: Validates an API key before persisting it as a config entry
// - **EntryStore**: Persistence for validated config entries
// - **SourceRegistry**: Plugin-based registry for shipment sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the HTTP client
// 2. **Single Writer**: Only the coordinator replaces the dataset
// 3. **Whole Snapshots**: Readers never observe a partially updated dataset
// 4. **Library-First**: The daemon is a thin adapter over this crate
// 5. **Stable Identity**: Entities are keyed by shipment id, never by position

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod registry;
pub mod sensor;
pub mod setup;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{CoordinatorConfig, ParcelConfig, SensorConfig, SourceConfig};
pub use coordinator::{CoordinatorEvent, RefreshHandle, RefreshOutcome, ShipmentCoordinator, Snapshot};
pub use error::{Error, Result};
pub use model::{Carrier, Dataset, HistoryEntry, Shipment, ShipmentId, TrackingEvent};
pub use registry::SourceRegistry;
pub use sensor::{EntityView, SensorSet, ShipmentIcon, ShipmentSensor, StatusColor, SyncReport};
pub use setup::{ConfigEntry, SetupError, SetupFlow};
pub use store::{FileEntryStore, MemoryEntryStore};
pub use traits::{EntryStore, ShipmentSource, ShipmentSourceFactory};
