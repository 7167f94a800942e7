//! # Kayak Launch Planner Core Library
//!
//! This library turns tide, current, wind and ferry-traffic data into scored
//! launch windows for a single shoreline launch site. It is organised as a
//! small pipeline of pure stages plus one async stage that talks to the
//! outside world:
//!
//! ## Data Flow
//! 1. **Fetch**: a [`providers::ConditionsProvider`] returns raw records for one date
//! 2. **Normalize**: records are resampled onto a fixed [`grid::TimeGrid`]
//!    (10 minutes by default), gaps become explicit unknowns
//! 3. **Evaluate**: every grid point gets one [`FactorAssessment`] per factor
//!    and a [`CompositeScore`]
//! 4. **Aggregate**: contiguous suitable points collapse into [`LaunchWindow`]s,
//!    which are ranked best-first
//! 5. **Schedule**: the above repeats per date into a [`schedule::WeekPlan`]
//!
//! ## Safety Model
//!
//! The suitability gate is conjunctive. A single failing factor vetoes a
//! timestamp no matter how good the others are, and missing data always
//! fails. Absence of data never implies safety.
//!
//! ## Temporal Resolution
//! One day at 10-minute granularity is 144 samples. Windows are reported
//! with the last member timestamp as `end`, so a window covers
//! `end - start + interval` minutes of water time.
//!
//! ## Core Types
//!
//! The value types shared by every stage live here:
//! - [`Observation`] and [`Series`]: one variable resampled onto a grid
//! - [`FactorAssessment`] and [`CompositeScore`]: per-timestamp rule output
//! - [`LaunchWindow`]: a run of suitable timestamps

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod aggregate;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod normalize;
pub mod payload;
pub mod providers;
pub mod report;
pub mod schedule;
pub mod units;

#[cfg(test)]
mod tests;

pub use error::LaunchError;
pub use grid::TimeGrid;

/// A timezone-aware instant aligned to the sampling grid of an evaluation.
pub type TimePoint = DateTime<FixedOffset>;

/// Which upstream provider an observation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Tide,
    Current,
    Wind,
    Ferry,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Tide,
        ProviderKind::Current,
        ProviderKind::Wind,
        ProviderKind::Ferry,
    ];
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Tide => "tide",
            ProviderKind::Current => "current",
            ProviderKind::Wind => "wind",
            ProviderKind::Ferry => "ferry",
        };
        f.write_str(name)
    }
}

/// One independently evaluated safety dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Tide,
    Current,
    Wind,
    Ferry,
}

impl Factor {
    /// Evaluation order, also the order of [`CompositeScore::contributing`].
    pub const ALL: [Factor; 4] = [Factor::Tide, Factor::Current, Factor::Wind, Factor::Ferry];

    /// The provider whose data this factor is judged on.
    pub fn provider(self) -> ProviderKind {
        match self {
            Factor::Tide => ProviderKind::Tide,
            Factor::Current => ProviderKind::Current,
            Factor::Wind => ProviderKind::Wind,
            Factor::Ferry => ProviderKind::Ferry,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.provider(), f)
    }
}

/// A single measurement at a grid timestamp.
///
/// `value` is `None` when the provider had no coverage for this timestamp.
/// Downstream rules treat that as a failure, never as a pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation<T> {
    pub timestamp: TimePoint,
    pub value: Option<T>,
    pub source: ProviderKind,
}

impl<T> Observation<T> {
    pub fn is_unknown(&self) -> bool {
        self.value.is_none()
    }
}

/// One variable resampled onto a [`TimeGrid`].
///
/// Holds exactly one observation per grid point, in grid order, so
/// timestamps are strictly increasing and never duplicated.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, NaiveDate};
/// use launch_window_lib::{ProviderKind, Series, TimeGrid};
///
/// let offset = FixedOffset::west_opt(7 * 3600).unwrap();
/// let date = NaiveDate::from_ymd_opt(2025, 7, 24).unwrap();
/// let grid = TimeGrid::for_date(date, 10, offset).unwrap();
///
/// let series: Series<f64> = Series::unknown(grid, ProviderKind::Tide);
/// assert_eq!(series.observations.len(), 144);
/// assert!(series.observations.iter().all(|o| o.is_unknown()));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series<T> {
    pub grid: TimeGrid,
    pub source: ProviderKind,
    pub observations: Vec<Observation<T>>,
}

impl<T> Series<T> {
    /// A series with every grid point unknown.
    pub fn unknown(grid: TimeGrid, source: ProviderKind) -> Self {
        let observations = grid
            .timestamps()
            .map(|timestamp| Observation {
                timestamp,
                value: None,
                source,
            })
            .collect();
        Series {
            grid,
            source,
            observations,
        }
    }

    /// Number of grid points with a known value.
    pub fn known_count(&self) -> usize {
        self.observations.iter().filter(|o| !o.is_unknown()).count()
    }

    pub fn value_at(&self, index: usize) -> Option<&T> {
        self.observations.get(index).and_then(|o| o.value.as_ref())
    }
}

impl<T: Clone> Series<T> {
    /// Known `(timestamp, value)` pairs in grid order.
    pub fn known_points(&self) -> Vec<(TimePoint, T)> {
        self.observations
            .iter()
            .filter_map(|o| o.value.clone().map(|v| (o.timestamp, v)))
            .collect()
    }
}

/// Tidal current at one instant. Speed is signed: flood positive, ebb negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentSample {
    pub speed_knots: f64,
    pub direction_deg: f64,
}

/// Sustained wind at one instant; direction is where the wind blows from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub speed_knots: f64,
    pub direction_deg: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FerryEventKind {
    Departure,
    Arrival,
}

/// A scheduled ferry movement at a terminal.
///
/// `timestamp` is the published time and the ferry buffer is measured from
/// it. The series slot the event sits in is the grid point nearest to it,
/// or the first or last point for events just across midnight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FerryEvent {
    pub timestamp: TimePoint,
    pub terminal: String,
    pub direction: String,
    pub kind: FerryEventKind,
}

/// Result of applying one factor's rule at one timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorAssessment {
    pub factor: Factor,
    pub timestamp: TimePoint,
    pub passes: bool,
    /// 0.0 is ideal, 1.0 is the worst possible (or unknown) reading
    pub severity: f64,
    pub reason: String,
    /// Measured value the rule looked at, if any
    pub reading: Option<f64>,
}

impl FactorAssessment {
    /// Fail-safe assessment for a timestamp without data.
    pub fn unknown(factor: Factor, timestamp: TimePoint) -> Self {
        FactorAssessment {
            factor,
            timestamp,
            passes: false,
            severity: 1.0,
            reason: format!("no {factor} data"),
            reading: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        !self.passes && self.reading.is_none()
    }
}

/// Coarse label for a timestamp's suitability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Unsafe,
    Marginal,
    Acceptable,
    Optimal,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rating::Unsafe => "not recommended",
            Rating::Marginal => "marginal",
            Rating::Acceptable => "acceptable",
            Rating::Optimal => "optimal",
        };
        f.write_str(label)
    }
}

/// Per-timestamp aggregate of all four factor assessments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub timestamp: TimePoint,
    /// True iff every contributing assessment passes
    pub overall_suitable: bool,
    /// Weighted mean of `1 - severity`, computed even when unsuitable
    pub score: f64,
    pub rating: Rating,
    /// One assessment per factor, in [`Factor::ALL`] order
    pub contributing: Vec<FactorAssessment>,
}

impl CompositeScore {
    pub fn assessment(&self, factor: Factor) -> Option<&FactorAssessment> {
        self.contributing.iter().find(|a| a.factor == factor)
    }
}

/// A maximal run of suitable timestamps.
///
/// `end` is the last member timestamp, so a single-sample window has
/// `end == start` and lasts one sampling interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchWindow {
    pub start: TimePoint,
    pub end: TimePoint,
    pub avg_score: f64,
    pub peak_score: f64,
    pub sample_count: usize,
    /// Water time covered: `end - start + interval`
    pub duration_minutes: i64,
}

impl LaunchWindow {
    pub fn overlaps(&self, other: &LaunchWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}
