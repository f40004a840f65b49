//! Core traits for the parcel poller
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ShipmentSource`]: Fetch shipments from the tracking API
//! - [`EntryStore`]: Persistence for validated config entries
//! - [`entity`]: Capability contracts a presentation entity implements

pub mod entity;
pub mod entry_store;
pub mod shipment_source;

pub use entity::{DescribesEntity, ProvidesAttributes, ProvidesState, ReportsAvailability};
pub use entry_store::{ConfigEntry, EntryStore};
pub use shipment_source::{ShipmentSource, ShipmentSourceFactory};
