//! Derived presentation fields
//!
//! Everything here is a pure function of a shipment's status text or its
//! identifying fields. Nothing is persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Color hint for rendering a shipment's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Blue,
    Red,
    Orange,
    Grey,
}

impl StatusColor {
    /// Classify a free-text status
    ///
    /// Case-insensitive substring match, first match wins:
    /// `delivered` → green, `transit` → blue, `exception`/`fail` → red,
    /// `pending`/`pre-transit` → orange, anything else → grey.
    ///
    /// Note that `pre-transit` also contains `transit`, so it is blue.
    pub fn for_status(status: &str) -> Self {
        let status = status.to_lowercase();

        if status.contains("delivered") {
            StatusColor::Green
        } else if status.contains("transit") {
            StatusColor::Blue
        } else if status.contains("exception") || status.contains("fail") {
            StatusColor::Red
        } else if status.contains("pending") || status.contains("pre-transit") {
            StatusColor::Orange
        } else {
            StatusColor::Grey
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusColor::Green => "green",
            StatusColor::Blue => "blue",
            StatusColor::Red => "red",
            StatusColor::Orange => "orange",
            StatusColor::Grey => "grey",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Icon for a shipment's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipmentIcon {
    Delivered,
    InTransit,
    OutForDelivery,
    Problem,
    Default,
}

impl ShipmentIcon {
    /// Pick an icon by exact (normalized) status
    ///
    /// The status is lower-cased and `-`/space become `_`, so
    /// "Out for delivery" and "out-for-delivery" both match `out_for_delivery`.
    pub fn for_status(status: &str) -> Self {
        let normalized: String = status
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "delivered" => ShipmentIcon::Delivered,
            "in_transit" => ShipmentIcon::InTransit,
            "out_for_delivery" => ShipmentIcon::OutForDelivery,
            "exception" | "failure" | "failed" => ShipmentIcon::Problem,
            _ => ShipmentIcon::Default,
        }
    }

    /// Material Design icon name
    pub fn mdi(self) -> &'static str {
        match self {
            ShipmentIcon::Delivered => "mdi:package-variant-closed-check",
            ShipmentIcon::InTransit => "mdi:truck-delivery",
            ShipmentIcon::OutForDelivery => "mdi:truck-fast",
            ShipmentIcon::Problem => "mdi:alert-circle",
            ShipmentIcon::Default => "mdi:package-variant-closed",
        }
    }
}

/// Join prefix, carrier and tracking number, skipping empty parts
pub fn display_name(prefix: &str, carrier: Option<&str>, tracking_number: Option<&str>) -> String {
    [Some(prefix), carrier, tracking_number]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
