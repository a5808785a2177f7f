// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the coordinator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier of an arrival session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays for the coordinator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Notification,
    Fulfillment,
}

/// A destination (merchant location) sessions travel to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters; `None` means the service default applies.
    pub radius_m: Option<f64>,
    /// Expected walk/approach time from the geofence edge to hand-off.
    pub approach_secs: Option<u64>,
    /// Destination-side recipient address handed to the notifier.
    pub recipient: String,
}

impl Destination {
    /// Builds the anchor used for arrival checks.
    pub fn anchor(&self, default_radius_m: f64) -> Anchor {
        Anchor {
            latitude: self.latitude,
            longitude: self.longitude,
            radius_m: self.radius_m.unwrap_or(default_radius_m),
        }
    }
}

/// Fixed destination coordinate plus geofence radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// A position reported by the phone channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, as reported by the device.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

/// Counts of records removed by a purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub idempotency_records: u64,
    pub linking_codes: u64,
}
