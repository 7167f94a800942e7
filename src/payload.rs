//! Raw provider records, before they are aligned onto a grid.
//!
//! Each provider kind has its own record shape; [`ProviderPayload`] tags them
//! so the normalizer can validate the shape on entry instead of guessing.

use crate::{FerryEventKind, TimePoint};
use serde::{Deserialize, Serialize};

/// Predicted water level above chart datum (MLLW).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideRecord {
    pub timestamp: TimePoint,
    pub height_ft: f64,
}

/// Predicted tidal current. Flood is positive speed, ebb negative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentRecord {
    pub timestamp: TimePoint,
    pub speed_knots: f64,
    pub direction_deg: f64,
}

/// Forecast or observed sustained wind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindRecord {
    pub timestamp: TimePoint,
    pub speed_knots: f64,
    pub direction_deg: f64,
}

/// A scheduled sailing at a terminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FerryRecord {
    pub timestamp: TimePoint,
    pub terminal: String,
    pub direction: String,
    pub kind: FerryEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum ProviderPayload {
    Tide(Vec<TideRecord>),
    Current(Vec<CurrentRecord>),
    Wind(Vec<WindRecord>),
    Ferry(Vec<FerryRecord>),
}
