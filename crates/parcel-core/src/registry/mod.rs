//! Plugin-based shipment source registry
//!
//! Sources are registered by type name at startup so the daemon and the
//! setup flow can build them from a [`SourceConfig`] without knowing which
//! crate provides the transport.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parcel_core::{SourceConfig, SourceRegistry};
//!
//! let registry = SourceRegistry::new();
//!
//! // In the parcel-source-http crate
//! parcel_source_http::register(&registry);
//!
//! let config = SourceConfig::ParcelApp { ... };
//! let source = registry.create_source(&config)?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::traits::{ShipmentSource, ShipmentSourceFactory};

/// Registry mapping source type names to factories
///
/// Uses interior mutability, so a shared `&SourceRegistry` (or an
/// `Arc<SourceRegistry>`) is enough to both register and create.
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Arc<dyn ShipmentSourceFactory>>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source factory under a type name
    ///
    /// A second registration under the same name replaces the first.
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn ShipmentSourceFactory>) {
        let name = name.into();
        tracing::debug!("Registering shipment source: {}", name);
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::from(factory));
    }

    /// Create a shipment source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ShipmentSource>)`: Created source instance
    /// - `Err(Error::Config)`: If the source type is not registered
    /// - `Err(Error)`: Whatever the factory reports
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn ShipmentSource>> {
        let source_type = config.type_name();

        let factory = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown source type: {}", source_type)))?;

        factory.create(config)
    }

    /// List all registered source types, sorted
    pub fn list_sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.list_sources())
            .finish()
    }
}
