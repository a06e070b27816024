use serde::{Deserialize, Serialize};
use std::fmt;

use super::MPS_TO_KMH;

/// Identifier of the tracked unit. Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OperatorId(String);

impl OperatorId {
    /// Returns `None` for blank input. The value is kept as entered.
    pub fn new(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One position measurement as delivered by a location source.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Fix {
    #[cfg(test)]
    pub fn new(latitude: f64, longitude: f64, speed: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            speed,
        }
    }
}

/// Normalized record sent as the `updateLocation` payload and kept for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    #[serde(rename = "busId")]
    operator_id: OperatorId,
    latitude: f64,
    longitude: f64,
    #[serde(rename = "speed")]
    speed_mps: f64,
    #[serde(rename = "timestamp")]
    captured_at: String,
}

impl LocationReport {
    pub(super) fn new(
        operator_id: OperatorId,
        latitude: f64,
        longitude: f64,
        speed_mps: f64,
        captured_at: String,
    ) -> Self {
        Self {
            operator_id,
            latitude,
            longitude,
            speed_mps,
            captured_at,
        }
    }

    pub fn operator_id(&self) -> &OperatorId {
        &self.operator_id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps() * MPS_TO_KMH
    }

    pub fn captured_at(&self) -> &str {
        &self.captured_at
    }
}
