//! Entity mapper
//!
//! Turns coordinator snapshots into one stable sensor per shipment id.
//!
//! Sensors are matched by shipment id, never by position in the upstream
//! list. Matching by index would make a reordered or shortened list
//! silently relabel the wrong sensor.
//!
//! ## Sync Rules
//!
//! | snapshot                | new ids      | missing ids      | kept sensors      |
//! |-------------------------|--------------|------------------|-------------------|
//! | refresh succeeded       | sensor added | sensor removed   | synced, available |
//! | refresh failed          | ignored      | kept             | marked unavailable|

pub mod entity;
pub mod presentation;

pub use entity::ShipmentSensor;
pub use presentation::{ShipmentIcon, StatusColor, display_name};

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::coordinator::Snapshot;
use crate::model::ShipmentId;
use crate::traits::{DescribesEntity, ProvidesAttributes, ProvidesState, ReportsAvailability};

/// What one [`SensorSet::apply`] call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Sensors created for ids seen for the first time
    pub added: Vec<ShipmentId>,
    /// Sensors dropped because their id left the dataset
    pub removed: Vec<ShipmentId>,
    /// Existing sensors whose data or availability changed
    pub updated: Vec<ShipmentId>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Host-facing rendering of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub unique_id: String,
    pub name: String,
    pub state: String,
    pub icon: &'static str,
    pub available: bool,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl EntityView {
    /// Render any entity that implements the capability traits
    pub fn from_entity<E>(entity: &E) -> Self
    where
        E: DescribesEntity + ProvidesState + ProvidesAttributes + ReportsAvailability,
    {
        Self {
            unique_id: entity.unique_id(),
            name: entity.name(),
            state: entity.native_value(),
            icon: entity.icon(),
            available: entity.available(),
            attributes: entity.extra_attributes(),
        }
    }
}

/// All sensors for one coordinator, keyed by shipment id
#[derive(Debug, Clone)]
pub struct SensorSet {
    name_prefix: String,
    order: Vec<ShipmentId>,
    sensors: HashMap<ShipmentId, ShipmentSensor>,
}

impl SensorSet {
    /// Create an empty set whose sensors use the given display name prefix
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            order: Vec::new(),
            sensors: HashMap::new(),
        }
    }

    /// Bring the set in line with a snapshot
    pub fn apply(&mut self, snapshot: &Snapshot) -> SyncReport {
        let mut report = SyncReport::default();

        if snapshot.last_update_success {
            let present: HashSet<&ShipmentId> = snapshot.dataset.ids().collect();

            for id in &self.order {
                if !present.contains(id) {
                    self.sensors.remove(id);
                    report.removed.push(id.clone());
                }
            }

            for id in snapshot.dataset.ids() {
                if !self.sensors.contains_key(id) {
                    let sensor = ShipmentSensor::new(id.clone(), self.name_prefix.clone(), snapshot);
                    self.sensors.insert(id.clone(), sensor);
                    report.added.push(id.clone());
                }
            }

            self.order = snapshot.dataset.ids().cloned().collect();
        }

        let added: HashSet<&ShipmentId> = report.added.iter().collect();
        let mut updated = Vec::new();
        for id in &self.order {
            if added.contains(id) {
                continue;
            }
            if let Some(sensor) = self.sensors.get_mut(id)
                && sensor.sync(snapshot)
            {
                updated.push(id.clone());
            }
        }
        report.updated = updated;

        report
    }

    /// Look up the sensor for a shipment id
    pub fn get(&self, id: &ShipmentId) -> Option<&ShipmentSensor> {
        self.sensors.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sensors in upstream order
    pub fn iter(&self) -> impl Iterator<Item = &ShipmentSensor> {
        self.order.iter().filter_map(|id| self.sensors.get(id))
    }

    /// Render every sensor for the host
    pub fn render(&self) -> Vec<EntityView> {
        self.iter().map(EntityView::from_entity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dataset, Shipment};
    use std::sync::Arc;

    fn snapshot(ids: &[u64], success: bool) -> Snapshot {
        Snapshot {
            dataset: Arc::new(Dataset::from_shipments(
                ids.iter().map(|id| Shipment::new(*id).with_status(format!("status-{}", id))),
            )),
            last_update_success: success,
            last_success_at: None,
            last_attempt_at: Some(chrono::Utc::now()),
            last_error: None,
            generation: 1,
        }
    }

    #[test]
    fn test_apply_adds_and_removes_by_id() {
        let mut set = SensorSet::new("Parcel");

        let report = set.apply(&snapshot(&[1, 42], true));
        assert_eq!(report.added, vec![ShipmentId::from(1u64), ShipmentId::from(42u64)]);
        assert_eq!(set.len(), 2);

        let report = set.apply(&snapshot(&[1], true));
        assert_eq!(report.removed, vec![ShipmentId::from(42u64)]);
        assert!(set.get(&ShipmentId::from(42u64)).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_reorder_does_not_relabel() {
        let mut set = SensorSet::new("Parcel");
        set.apply(&snapshot(&[1, 2, 3], true));

        let report = set.apply(&snapshot(&[3, 1, 2], true));
        assert!(report.is_empty(), "reordering alone changes nothing: {:?}", report);

        for sensor in set.iter() {
            let expected = format!("status-{}", sensor.shipment_id());
            assert_eq!(sensor.native_value(), expected);
        }
        let ids: Vec<String> = set.iter().map(|s| s.shipment_id().to_string()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_new_sensors_are_not_reported_as_updated() {
        let mut set = SensorSet::new("Parcel");
        let first: Vec<u64> = (0..500).collect();
        let grown: Vec<u64> = (0..1000).rev().collect();

        set.apply(&snapshot(&first, true));
        let report = set.apply(&snapshot(&grown, true));

        assert_eq!(report.added.len(), 500);
        assert!(report.added.iter().all(|id| !report.updated.contains(id)));
        assert!(report.updated.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(set.len(), 1000);
    }

    #[test]
    fn test_failed_snapshot_keeps_sensors_unavailable() {
        let mut set = SensorSet::new("Parcel");
        set.apply(&snapshot(&[1, 2], true));

        // A failed refresh carries the previous dataset
        let report = set.apply(&snapshot(&[1, 2], false));
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(report.updated.len(), 2);
        assert!(set.iter().all(|s| !s.available()));

        set.apply(&snapshot(&[1, 2], true));
        assert!(set.iter().all(|s| s.available()));
    }

    #[test]
    fn test_render_views() {
        let mut set = SensorSet::new("Parcel");
        set.apply(&snapshot(&[5], true));

        let views = set.render();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].unique_id, "parcel_5");
        assert_eq!(views[0].state, "status-5");
        assert!(views[0].available);
    }
}
