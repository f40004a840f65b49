//! Per-shipment sensor entity

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::presentation::{ShipmentIcon, StatusColor, display_name};
use crate::coordinator::Snapshot;
use crate::model::{Shipment, ShipmentId};
use crate::traits::{DescribesEntity, ProvidesAttributes, ProvidesState, ReportsAvailability};

/// Placeholder for attributes the API didn't supply
const UNKNOWN_ATTRIBUTE: &str = "Unknown";

/// State value when a shipment has no status
const UNKNOWN_STATE: &str = "unknown";

/// Read-only sensor representing one shipment
///
/// The sensor owns a copy of the last data it saw for its shipment id.
/// When a refresh fails, or the shipment vanishes from a successful
/// refresh, the copy is kept and the sensor reports itself unavailable.
#[derive(Debug, Clone)]
pub struct ShipmentSensor {
    id: ShipmentId,
    name_prefix: String,
    shipment: Option<Shipment>,
    available: bool,
}

impl ShipmentSensor {
    /// Create a sensor for a shipment id and sync it with a snapshot
    pub fn new(id: ShipmentId, name_prefix: impl Into<String>, snapshot: &Snapshot) -> Self {
        let mut sensor = Self {
            id,
            name_prefix: name_prefix.into(),
            shipment: None,
            available: false,
        };
        sensor.sync(snapshot);
        sensor
    }

    /// Shipment id this sensor represents
    pub fn shipment_id(&self) -> &ShipmentId {
        &self.id
    }

    /// Last known data for the shipment
    pub fn shipment(&self) -> Option<&Shipment> {
        self.shipment.as_ref()
    }

    /// Pull this sensor's shipment out of a snapshot
    ///
    /// Returns `true` if anything visible changed.
    pub fn sync(&mut self, snapshot: &Snapshot) -> bool {
        let current = snapshot.dataset.get(&self.id);
        let mut changed = false;

        if let Some(shipment) = current
            && self.shipment.as_ref() != Some(shipment)
        {
            self.shipment = Some(shipment.clone());
            changed = true;
        }

        let available = snapshot.last_update_success && current.is_some();
        if available != self.available {
            self.available = available;
            changed = true;
        }

        changed
    }

    /// Color hint for the current status
    pub fn status_color(&self) -> StatusColor {
        StatusColor::for_status(self.status().unwrap_or_default())
    }

    fn status(&self) -> Option<&str> {
        self.shipment.as_ref().and_then(|s| s.status.as_deref())
    }
}

impl DescribesEntity for ShipmentSensor {
    fn unique_id(&self) -> String {
        format!("parcel_{}", self.id)
    }

    fn name(&self) -> String {
        let shipment = self.shipment.as_ref();
        display_name(
            &self.name_prefix,
            shipment.and_then(Shipment::carrier_name),
            shipment.and_then(|s| s.tracking_number.as_deref()),
        )
    }

    fn icon(&self) -> &'static str {
        ShipmentIcon::for_status(self.status().unwrap_or_default()).mdi()
    }
}

impl ProvidesState for ShipmentSensor {
    fn native_value(&self) -> String {
        self.status()
            .map(str::to_lowercase)
            .unwrap_or_else(|| UNKNOWN_STATE.to_string())
    }
}

impl ProvidesAttributes for ShipmentSensor {
    fn extra_attributes(&self) -> BTreeMap<String, Value> {
        let mut attributes = BTreeMap::new();
        let Some(shipment) = self.shipment.as_ref() else {
            return attributes;
        };

        let text = |value: Option<&str>| json!(value.unwrap_or(UNKNOWN_ATTRIBUTE));

        attributes.insert("name".to_string(), text(shipment.name.as_deref()));
        attributes.insert("carrier".to_string(), text(shipment.carrier_name()));
        attributes.insert(
            "tracking_number".to_string(),
            text(shipment.tracking_number.as_deref()),
        );
        attributes.insert("status".to_string(), text(shipment.status.as_deref()));
        attributes.insert(
            "status_description".to_string(),
            text(shipment.status_description.as_deref()),
        );
        attributes.insert(
            "estimated_delivery".to_string(),
            text(shipment.estimated_delivery.as_deref()),
        );
        attributes.insert("last_update".to_string(), text(shipment.last_update.as_deref()));
        attributes.insert(
            "from_location".to_string(),
            text(shipment.from_location.as_deref()),
        );
        attributes.insert("to_location".to_string(), text(shipment.to_location.as_deref()));
        attributes.insert("shipment_id".to_string(), json!(shipment.id.as_str()));
        attributes.insert("status_color".to_string(), json!(self.status_color().as_str()));

        if let Some(location) = &shipment.location {
            attributes.insert("location".to_string(), location.clone());
        }
        if let Some(history) = &shipment.tracking_history
            && let Ok(history) = serde_json::to_value(history)
        {
            attributes.insert("tracking_history".to_string(), history);
        }

        attributes
    }
}

impl ReportsAvailability for ShipmentSensor {
    fn available(&self) -> bool {
        self.available
    }
}
