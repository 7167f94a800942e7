//! # Time Series Normalizer
//!
//! Resamples irregular provider records onto a shared [`TimeGrid`].
//!
//! ## Continuous Variables
//! Tide height, current and wind are linearly interpolated between the two
//! raw points that bracket each grid timestamp:
//! ```text
//! value = v0 + (v1 - v0) * (t - t0) / (t1 - t0)
//! ```
//! Bearings use the shorter arc (see [`crate::units::interpolate_bearing`]).
//! A grid point that coincides with a raw timestamp takes the raw value
//! unchanged, which makes normalization idempotent.
//!
//! ## Coverage Gaps
//! Grid points before the first raw point, after the last one, or inside a
//! raw gap longer than [`MAX_INTERPOLATION_GAP_MINUTES`] become explicit
//! unknown observations. They are never dropped and never filled.
//!
//! ## Ferry Events
//! Events are categorical and are not interpolated. Each one is placed in
//! the slot of its nearest grid point; an event exactly between two points
//! goes to the later one. The slot only says where an event is filed: the
//! event keeps its published time, and the evaluator measures the ferry
//! buffer from that.

use crate::payload::{CurrentRecord, FerryRecord, ProviderPayload, TideRecord, WindRecord};
use crate::units::interpolate_bearing;
use crate::{
    CurrentSample, FerryEvent, LaunchError, Observation, ProviderKind, Series, TimeGrid,
    TimePoint, WindSample,
};
use tracing::debug;

/// Raw points farther apart than this are not interpolated across.
pub const MAX_INTERPOLATION_GAP_MINUTES: i64 = 6 * 60;

/// Values that can be blended between two neighbouring raw points.
pub trait Interpolate: Copy {
    /// `alpha = 0.0` yields `a`, `alpha = 1.0` yields `b`.
    fn interpolate(a: Self, b: Self, alpha: f64) -> Self;

    /// Rejects NaN and infinite components.
    fn is_finite(&self) -> bool;
}

impl Interpolate for f64 {
    fn interpolate(a: Self, b: Self, alpha: f64) -> Self {
        a + (b - a) * alpha
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl Interpolate for CurrentSample {
    fn interpolate(a: Self, b: Self, alpha: f64) -> Self {
        CurrentSample {
            speed_knots: f64::interpolate(a.speed_knots, b.speed_knots, alpha),
            direction_deg: interpolate_bearing(a.direction_deg, b.direction_deg, alpha),
        }
    }

    fn is_finite(&self) -> bool {
        self.speed_knots.is_finite() && self.direction_deg.is_finite()
    }
}

impl Interpolate for WindSample {
    fn interpolate(a: Self, b: Self, alpha: f64) -> Self {
        WindSample {
            speed_knots: f64::interpolate(a.speed_knots, b.speed_knots, alpha),
            direction_deg: interpolate_bearing(a.direction_deg, b.direction_deg, alpha),
        }
    }

    fn is_finite(&self) -> bool {
        self.speed_knots.is_finite() && self.direction_deg.is_finite()
    }
}

/// A normalized series of whichever provider kind the payload carried.
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedSeries {
    Tide(Series<f64>),
    Current(Series<CurrentSample>),
    Wind(Series<WindSample>),
    Ferry(Series<Vec<FerryEvent>>),
}

/// Normalize any provider payload onto `grid`.
///
/// The grid fixes interval, range and timezone; every observation in the
/// result carries a grid timestamp in the grid's offset.
///
/// # Errors
/// [`LaunchError::InsufficientData`] when the payload has too few points,
/// contains non-finite values, or does not overlap the grid at all.
pub fn normalize(raw: &ProviderPayload, grid: &TimeGrid) -> Result<NormalizedSeries, LaunchError> {
    Ok(match raw {
        ProviderPayload::Tide(records) => NormalizedSeries::Tide(normalize_tide(records, grid)?),
        ProviderPayload::Current(records) => {
            NormalizedSeries::Current(normalize_current(records, grid)?)
        }
        ProviderPayload::Wind(records) => NormalizedSeries::Wind(normalize_wind(records, grid)?),
        ProviderPayload::Ferry(records) => {
            NormalizedSeries::Ferry(normalize_ferry(records, grid)?)
        }
    })
}

pub fn normalize_tide(records: &[TideRecord], grid: &TimeGrid) -> Result<Series<f64>, LaunchError> {
    let points = records
        .iter()
        .map(|r| (r.timestamp, r.height_ft))
        .collect();
    resample(points, grid, ProviderKind::Tide)
}

pub fn normalize_current(
    records: &[CurrentRecord],
    grid: &TimeGrid,
) -> Result<Series<CurrentSample>, LaunchError> {
    let points = records
        .iter()
        .map(|r| {
            let sample = CurrentSample {
                speed_knots: r.speed_knots,
                direction_deg: r.direction_deg,
            };
            (r.timestamp, sample)
        })
        .collect();
    resample(points, grid, ProviderKind::Current)
}

pub fn normalize_wind(
    records: &[WindRecord],
    grid: &TimeGrid,
) -> Result<Series<WindSample>, LaunchError> {
    let points = records
        .iter()
        .map(|r| {
            let sample = WindSample {
                speed_knots: r.speed_knots,
                direction_deg: r.direction_deg,
            };
            (r.timestamp, sample)
        })
        .collect();
    resample(points, grid, ProviderKind::Wind)
}

/// Place ferry events in the slot of their nearest grid point.
///
/// Every grid point of the result is known: an empty slot means no event
/// snapped there. Events whose nearest point lies off the grid go to the
/// first or last slot, so a sailing just across midnight still reaches the
/// evaluator. Events keep their published timestamp.
pub fn normalize_ferry(
    records: &[FerryRecord],
    grid: &TimeGrid,
) -> Result<Series<Vec<FerryEvent>>, LaunchError> {
    if records.is_empty() {
        return Err(LaunchError::insufficient(
            ProviderKind::Ferry,
            "schedule contains no sailings",
        ));
    }

    let offset = grid.offset();
    let last = grid.len().saturating_sub(1);
    let mut slots: Vec<Vec<FerryEvent>> = vec![Vec::new(); grid.len()];
    let mut off_grid = 0usize;

    for record in records {
        let timestamp = record.timestamp.with_timezone(&offset);
        let index = match grid.snap_index(timestamp) {
            Some(index) => index,
            None => {
                off_grid += 1;
                if timestamp < grid.start() {
                    0
                } else {
                    last
                }
            }
        };
        slots[index].push(FerryEvent {
            timestamp,
            terminal: record.terminal.clone(),
            direction: record.direction.clone(),
            kind: record.kind,
        });
    }
    if off_grid > 0 {
        debug!(off_grid, grid = %grid, "ferry events kept in edge slots");
    }

    for slot in &mut slots {
        slot.sort_by_key(|e| e.timestamp);
    }

    let observations = grid
        .timestamps()
        .zip(slots)
        .map(|(timestamp, events)| Observation {
            timestamp,
            value: Some(events),
            source: ProviderKind::Ferry,
        })
        .collect();

    Ok(Series {
        grid: grid.clone(),
        source: ProviderKind::Ferry,
        observations,
    })
}

/// Validate raw points and interpolate them onto the grid.
pub fn resample<T: Interpolate>(
    mut points: Vec<(TimePoint, T)>,
    grid: &TimeGrid,
    provider: ProviderKind,
) -> Result<Series<T>, LaunchError> {
    if let Some((ts, _)) = points.iter().find(|(_, v)| !v.is_finite()) {
        return Err(LaunchError::insufficient(
            provider,
            format!("non-finite value at {}", ts.to_rfc3339()),
        ));
    }

    // Providers are not guaranteed to deliver in order; stable sort keeps the
    // first of any duplicate timestamps in front for dedup_by_key
    points.sort_by_key(|(ts, _)| *ts);
    let before = points.len();
    points.dedup_by_key(|(ts, _)| *ts);
    if points.len() < before {
        debug!(
            provider = %provider,
            duplicates = before - points.len(),
            "dropped duplicate timestamps"
        );
    }

    if points.len() < 2 {
        return Err(LaunchError::insufficient(
            provider,
            format!("need at least 2 points, got {}", points.len()),
        ));
    }

    let offset = grid.offset();
    let max_gap = chrono::Duration::minutes(MAX_INTERPOLATION_GAP_MINUTES);

    let observations: Vec<Observation<T>> = grid
        .timestamps()
        .map(|ts| Observation {
            timestamp: ts,
            value: sample_at(&points, ts, max_gap),
            source: provider,
        })
        .collect();

    let series = Series {
        grid: grid.clone(),
        source: provider,
        observations,
    };

    if series.known_count() == 0 {
        return Err(LaunchError::insufficient(
            provider,
            format!(
                "points {} .. {} do not cover the requested day",
                points[0].0.with_timezone(&offset).to_rfc3339(),
                points[points.len() - 1].0.with_timezone(&offset).to_rfc3339()
            ),
        ));
    }

    Ok(series)
}

/// Interpolated value at `ts`, or `None` outside coverage.
fn sample_at<T: Interpolate>(
    points: &[(TimePoint, T)],
    ts: TimePoint,
    max_gap: chrono::Duration,
) -> Option<T> {
    // First point strictly after ts
    let upper = points.partition_point(|(t, _)| *t <= ts);
    if upper == 0 {
        return None;
    }
    let (t0, v0) = points[upper - 1];
    if t0 == ts {
        return Some(v0);
    }
    let (t1, v1) = *points.get(upper)?;
    let span = t1 - t0;
    if span > max_gap {
        return None;
    }
    let alpha = (ts - t0).num_milliseconds() as f64 / span.num_milliseconds() as f64;
    Some(T::interpolate(v0, v1, alpha))
}
