use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Where a stored location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Submitted by a user (device location or an initiator override).
    Manual,
    /// Produced by the meeting-point computation.
    Automatic,
}

/// A coordinate pair plus provenance, stored as a JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub lat: f64,
    pub lng: f64,
    pub source: LocationSource,
    pub updated_at: DateTime<Utc>,
}

impl LocationInfo {
    pub fn manual(point: LatLng) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
            source: LocationSource::Manual,
            updated_at: Utc::now(),
        }
    }

    pub fn automatic(point: LatLng) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
            source: LocationSource::Automatic,
            updated_at: Utc::now(),
        }
    }

    pub fn point(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lng: self.lng,
        }
    }
}
