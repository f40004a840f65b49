//! Shipment data model
//!
//! These types mirror the `shipments` array returned by the tracking API.
//! Every field except `id` is optional: the upstream payload is loosely
//! specified and a single odd record must not poison the whole fetch.
//!
//! ## Payload Example
//!
//! ```json
//! {
//!   "shipments": [
//!     {
//!       "id": 42,
//!       "name": "New headphones",
//!       "carrier": { "name": "DHL" },
//!       "tracking_number": "JD0146000033",
//!       "status": "in_transit",
//!       "status_description": "Departed facility",
//!       "estimated_delivery": "2025-03-02",
//!       "last_update": "2025-02-28T09:14:00Z",
//!       "from_location": "Leipzig, DE",
//!       "to_location": "Lisbon, PT"
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identity of a shipment across refreshes
///
/// The API sends ids as either JSON numbers or strings; both normalize to
/// the same textual form so `42` and `"42"` name the same shipment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ShipmentId(String);

impl ShipmentId {
    /// Create an id from any textual form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the textual form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShipmentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for ShipmentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ShipmentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Self(text),
            Repr::Number(number) => Self(number.to_string()),
        })
    }
}

/// Carrier handling a shipment
///
/// Older payloads carry the carrier as a plain string, newer ones as an
/// object with a `name` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CarrierRepr")]
pub struct Carrier {
    /// Display name of the carrier, if the API supplied one
    pub name: Option<String>,
}

impl Carrier {
    /// Create a carrier with a known name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CarrierRepr {
    Plain(String),
    Object {
        #[serde(default, deserialize_with = "lenient_text")]
        name: Option<String>,
    },
    Other(serde_json::Value),
}

impl From<CarrierRepr> for Carrier {
    fn from(repr: CarrierRepr) -> Self {
        match repr {
            CarrierRepr::Plain(name) => Self { name: Some(name) },
            CarrierRepr::Object { name } => Self { name },
            CarrierRepr::Other(serde_json::Value::Number(code)) => Self {
                name: Some(code.to_string()),
            },
            CarrierRepr::Other(_) => Self { name: None },
        }
    }
}

/// One entry of a shipment's tracking history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,

    /// Fields this crate doesn't model, preserved for display
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One item of `tracking_history` as the API sent it
///
/// Objects are read as [`TrackingEvent`]s. Anything else (plain strings,
/// nested arrays) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Event(TrackingEvent),
    Raw(serde_json::Value),
}

impl HistoryEntry {
    /// The structured event, if this entry was an object
    pub fn as_event(&self) -> Option<&TrackingEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Raw(_) => None,
        }
    }
}

/// A tracked shipment as returned by one fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,

    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default)]
    pub carrier: Option<Carrier>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub tracking_number: Option<String>,

    /// Free-text status, e.g. "delivered", "in_transit", "exception"
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub status_description: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub estimated_delivery: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub last_update: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub from_location: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub to_location: Option<String>,

    /// Current location, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,

    /// Tracking history, passed through item by item
    #[serde(
        default,
        deserialize_with = "lenient_history",
        skip_serializing_if = "Option::is_none"
    )]
    pub tracking_history: Option<Vec<HistoryEntry>>,
}

impl Shipment {
    /// Create a shipment with only an id, mostly useful in tests
    pub fn new(id: impl Into<ShipmentId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            carrier: None,
            tracking_number: None,
            status: None,
            status_description: None,
            estimated_delivery: None,
            last_update: None,
            from_location: None,
            to_location: None,
            location: None,
            tracking_history: None,
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the carrier by name
    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(Carrier::named(carrier));
        self
    }

    /// Set the tracking number
    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }

    /// Carrier display name, if known
    pub fn carrier_name(&self) -> Option<&str> {
        self.carrier.as_ref().and_then(|c| c.name.as_deref())
    }
}

/// Accept strings, numbers and booleans as text; `null` becomes `None`
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        Some(serde_json::Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Accept a list of history items; a lone non-list value becomes a single item
fn lenient_history<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<HistoryEntry>>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Array(items)) => {
            Some(items.into_iter().map(history_entry).collect())
        }
        Some(other) => Some(vec![history_entry(other)]),
    })
}

fn history_entry(value: serde_json::Value) -> HistoryEntry {
    match value {
        serde_json::Value::Object(_) => serde_json::from_value(value.clone())
            .map(HistoryEntry::Event)
            .unwrap_or(HistoryEntry::Raw(value)),
        other => HistoryEntry::Raw(other),
    }
}

/// The full set of shipments from one successful fetch
///
/// Iteration follows upstream order. When the API repeats an id the later
/// record replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    order: Vec<ShipmentId>,
    by_id: HashMap<ShipmentId, Shipment>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from one fetch result
    pub fn from_shipments(shipments: impl IntoIterator<Item = Shipment>) -> Self {
        let mut dataset = Self::new();
        for shipment in shipments {
            if !dataset.by_id.contains_key(&shipment.id) {
                dataset.order.push(shipment.id.clone());
            }
            dataset.by_id.insert(shipment.id.clone(), shipment);
        }
        dataset
    }

    /// Look up a shipment by id
    pub fn get(&self, id: &ShipmentId) -> Option<&Shipment> {
        self.by_id.get(id)
    }

    /// Whether the dataset holds the given id
    pub fn contains(&self, id: &ShipmentId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of distinct shipments
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Shipment ids in upstream order
    pub fn ids(&self) -> impl Iterator<Item = &ShipmentId> {
        self.order.iter()
    }

    /// Shipments in upstream order
    pub fn iter(&self) -> impl Iterator<Item = &Shipment> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

impl FromIterator<Shipment> for Dataset {
    fn from_iter<I: IntoIterator<Item = Shipment>>(iter: I) -> Self {
        Self::from_shipments(iter)
    }
}
