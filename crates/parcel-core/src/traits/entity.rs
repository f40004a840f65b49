//! Capability contracts for presentation entities
//!
//! A host platform needs four things from an entity: how to describe it,
//! its current state, its extra attributes, and whether it's available.
//! Each is a separate trait so an adapter can depend on only what it renders.

use std::collections::BTreeMap;

/// Static-ish identity of an entity
pub trait DescribesEntity {
    /// Identifier that stays the same across refreshes and restarts
    fn unique_id(&self) -> String;

    /// Human-readable name
    fn name(&self) -> String;

    /// Material Design icon name, e.g. `mdi:truck-delivery`
    fn icon(&self) -> &'static str;
}

/// Provides the entity's primary state value
pub trait ProvidesState {
    fn native_value(&self) -> String;
}

/// Provides additional attributes shown alongside the state
pub trait ProvidesAttributes {
    fn extra_attributes(&self) -> BTreeMap<String, serde_json::Value>;
}

/// Reports whether the entity's state can be trusted right now
pub trait ReportsAvailability {
    fn available(&self) -> bool;
}
