//! # Safety Rule Evaluator
//!
//! Applies four independent rules at every grid timestamp and folds them
//! into a [`CompositeScore`].
//!
//! ## Severity Scale
//! Each assessment carries a severity in `[0, 1]`:
//! - **Passing**: `0.0` inside the comfort band, rising linearly to
//!   [`CAUTION_CEILING`] as the reading approaches the hard limit
//! - **Failing**: `CAUTION_CEILING` plus the distance past the limit divided
//!   by the factor's severity span, saturating at `1.0`
//! - **Unknown**: always `1.0` and always failing
//!
//! The scale is continuous across the limit, so the composite score also
//! reads sensibly on unsuitable timestamps (weekly overview graphs use it).
//!
//! ## Gate
//! `overall_suitable` is the logical AND of the four `passes` flags. Score
//! never overrides the gate.

use crate::config::ThresholdConfig;
use crate::units::compass_point;
use crate::{
    CompositeScore, CurrentSample, Factor, FactorAssessment, FerryEvent, LaunchError, Rating,
    Series, TimeGrid, TimePoint, WindSample,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Highest severity a passing reading can reach.
pub const CAUTION_CEILING: f64 = 0.5;

/// The four input series for one day, all on `grid`. A `None` series is
/// treated as unknown at every timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedConditions {
    pub grid: TimeGrid,
    pub tide: Option<Series<f64>>,
    pub current: Option<Series<CurrentSample>>,
    pub wind: Option<Series<WindSample>>,
    pub ferry: Option<Series<Vec<FerryEvent>>>,
}

impl AlignedConditions {
    /// Conditions with every series missing.
    pub fn empty(grid: TimeGrid) -> Self {
        AlignedConditions {
            grid,
            tide: None,
            current: None,
            wind: None,
            ferry: None,
        }
    }

    /// Every present series must share the conditions' grid.
    pub fn check_alignment(&self) -> Result<(), LaunchError> {
        let grids = [
            self.tide.as_ref().map(|s| (&s.grid, s.observations.len())),
            self.current.as_ref().map(|s| (&s.grid, s.observations.len())),
            self.wind.as_ref().map(|s| (&s.grid, s.observations.len())),
            self.ferry.as_ref().map(|s| (&s.grid, s.observations.len())),
        ];
        for (factor, entry) in Factor::ALL.iter().zip(grids) {
            let Some((grid, observed)) = entry else {
                continue;
            };
            if *grid != self.grid || observed != self.grid.len() {
                return Err(LaunchError::MisalignedSeries {
                    provider: factor.provider(),
                    expected: self.grid.to_string(),
                    found: format!("{grid} ({observed} observations)"),
                });
            }
        }
        Ok(())
    }
}

/// Composite scores of one day, one per grid point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSeries {
    pub grid: TimeGrid,
    pub scores: Vec<CompositeScore>,
}

impl ScoreSeries {
    pub fn suitable_count(&self) -> usize {
        self.scores.iter().filter(|s| s.overall_suitable).count()
    }
}

/// Score every timestamp of the conditions' grid.
///
/// Never fails on aligned input: unknown data produces failing assessments,
/// not errors.
///
/// # Errors
/// [`LaunchError::MisalignedSeries`] if a series was sampled on another grid.
pub fn evaluate(
    conditions: &AlignedConditions,
    thresholds: &ThresholdConfig,
) -> Result<ScoreSeries, LaunchError> {
    if let Err(e) = conditions.check_alignment() {
        error!(error = %e, "series handed to evaluator are not aligned");
        return Err(e);
    }

    let grid = &conditions.grid;
    let ferry_marks = conditions
        .ferry
        .as_ref()
        .map(|series| relevant_ferry_marks(series, thresholds.ferry_terminal.as_deref()));

    let scores = grid
        .timestamps()
        .enumerate()
        .map(|(i, ts)| {
            let tide = match conditions.tide.as_ref().and_then(|s| s.value_at(i)) {
                Some(height) => assess_tide(ts, *height, thresholds),
                None => FactorAssessment::unknown(Factor::Tide, ts),
            };
            let current = match conditions.current.as_ref().and_then(|s| s.value_at(i)) {
                Some(sample) => assess_current(ts, sample, thresholds),
                None => FactorAssessment::unknown(Factor::Current, ts),
            };
            let wind = match conditions.wind.as_ref().and_then(|s| s.value_at(i)) {
                Some(sample) => assess_wind(ts, sample, thresholds),
                None => FactorAssessment::unknown(Factor::Wind, ts),
            };
            let ferry = match &ferry_marks {
                Some(marks) if conditions.ferry.as_ref().and_then(|s| s.value_at(i)).is_some() => {
                    assess_ferry(ts, marks, thresholds)
                }
                _ => FactorAssessment::unknown(Factor::Ferry, ts),
            };
            composite(ts, vec![tide, current, wind, ferry], thresholds)
        })
        .collect();

    Ok(ScoreSeries {
        grid: grid.clone(),
        scores,
    })
}

/// Fold factor assessments into one composite score.
pub fn composite(
    timestamp: TimePoint,
    contributing: Vec<FactorAssessment>,
    thresholds: &ThresholdConfig,
) -> CompositeScore {
    let overall_suitable = contributing.iter().all(|a| a.passes);

    let weights = &thresholds.factor_weights;
    let usable = weights.total() > 0.0 && Factor::ALL.iter().all(|f| weights.weight(*f) >= 0.0);
    let (weighted, total) = contributing.iter().fold((0.0, 0.0), |(sum, total), a| {
        let w = if usable { weights.weight(a.factor) } else { 1.0 };
        (sum + w * (1.0 - a.severity), total + w)
    });
    let score = if total > 0.0 { weighted / total } else { 0.0 };

    let rating = if !overall_suitable {
        Rating::Unsafe
    } else if score >= thresholds.rating_optimal_min {
        Rating::Optimal
    } else if score >= thresholds.rating_acceptable_min {
        Rating::Acceptable
    } else {
        Rating::Marginal
    };

    CompositeScore {
        timestamp,
        overall_suitable,
        score,
        rating,
        contributing,
    }
}

/// Tide must stay within `[tide_min, tide_max]`.
pub fn assess_tide(ts: TimePoint, height: f64, t: &ThresholdConfig) -> FactorAssessment {
    let (passes, severity, reason) = if height < t.tide_min {
        (
            false,
            violation(t.tide_min - height, t.tide_severity_span_ft),
            format!("tide {height:.1} ft below minimum {:.1} ft", t.tide_min),
        )
    } else if height > t.tide_max {
        (
            false,
            violation(height - t.tide_max, t.tide_severity_span_ft),
            format!("tide {height:.1} ft above maximum {:.1} ft", t.tide_max),
        )
    } else if height < t.tide_comfort_min {
        (
            true,
            caution(t.tide_comfort_min - height, t.tide_comfort_min - t.tide_min),
            format!("tide {height:.1} ft, low side of comfortable"),
        )
    } else if height > t.tide_comfort_max {
        (
            true,
            caution(height - t.tide_comfort_max, t.tide_max - t.tide_comfort_max),
            format!("tide {height:.1} ft, high side of comfortable"),
        )
    } else {
        (true, 0.0, format!("tide {height:.1} ft"))
    };
    FactorAssessment {
        factor: Factor::Tide,
        timestamp: ts,
        passes,
        severity,
        reason,
        reading: Some(height),
    }
}

/// Absolute current speed must not exceed `current_max_knots`.
pub fn assess_current(ts: TimePoint, sample: &CurrentSample, t: &ThresholdConfig) -> FactorAssessment {
    let speed = sample.speed_knots.abs();
    let phase = current_phase(sample.speed_knots);
    let (passes, severity, reason) = if speed > t.current_max_knots {
        (
            false,
            violation(speed - t.current_max_knots, t.current_severity_span_knots),
            format!(
                "{phase} current {speed:.1} kn exceeds {:.1} kn",
                t.current_max_knots
            ),
        )
    } else {
        let comfort = t.current_comfort_max_knots.min(t.current_max_knots);
        (
            true,
            caution(speed - comfort, t.current_max_knots - comfort),
            format!("{phase} current {speed:.1} kn"),
        )
    };
    FactorAssessment {
        factor: Factor::Current,
        timestamp: ts,
        passes,
        severity,
        reason,
        reading: Some(speed),
    }
}

/// Wind must stay under `wind_max_knots`, or under the secondary limit when
/// it blows from an exposed bearing.
pub fn assess_wind(ts: TimePoint, sample: &WindSample, t: &ThresholdConfig) -> FactorAssessment {
    let speed = sample.speed_knots;
    let from = compass_point(sample.direction_deg);
    let exposed = t
        .wind_exposed_bearings
        .iter()
        .any(|range| range.contains(sample.direction_deg));
    let limit = if exposed {
        t.wind_exposed_secondary_max.min(t.wind_max_knots)
    } else {
        t.wind_max_knots
    };

    let (passes, severity, reason) = if speed > limit {
        let reason = if exposed && speed <= t.wind_max_knots {
            format!("wind {speed:.0} kn from {from} (exposed fetch) exceeds {limit:.0} kn")
        } else {
            format!("wind {speed:.0} kn from {from} exceeds {limit:.0} kn")
        };
        (false, violation(speed - limit, t.wind_severity_span_knots), reason)
    } else {
        let comfort = t.wind_comfort_max_knots.min(limit);
        (
            true,
            caution(speed - comfort, limit - comfort),
            format!("wind {speed:.0} kn from {from}"),
        )
    };
    FactorAssessment {
        factor: Factor::Wind,
        timestamp: ts,
        passes,
        severity,
        reason,
        reading: Some(speed),
    }
}

/// A ferry event relevant to the launch corridor, at its published time.
#[derive(Clone, Debug)]
pub struct FerryMark {
    pub at: TimePoint,
    pub terminal: String,
    pub direction: String,
}

/// Events at the relevant terminal, ordered by published time.
pub fn relevant_ferry_marks(series: &Series<Vec<FerryEvent>>, terminal: Option<&str>) -> Vec<FerryMark> {
    let mut marks: Vec<FerryMark> = series
        .observations
        .iter()
        .filter_map(|o| o.value.as_ref())
        .flatten()
        .filter(|e| terminal.map_or(true, |wanted| e.terminal.eq_ignore_ascii_case(wanted)))
        .map(|e| FerryMark {
            at: e.timestamp,
            terminal: e.terminal.clone(),
            direction: e.direction.clone(),
        })
        .collect();
    marks.sort_by_key(|m| m.at);
    marks
}

/// Fails when the nearest relevant ferry event is strictly closer than the
/// buffer, measured from its published time rather than its grid slot.
/// Exactly `ferry_buffer_minutes` away passes.
pub fn assess_ferry(ts: TimePoint, marks: &[FerryMark], t: &ThresholdConfig) -> FactorAssessment {
    let nearest = nearest_mark(ts, marks);
    let buffer = i64::from(t.ferry_buffer_minutes);

    let Some((mark, distance)) = nearest else {
        return FactorAssessment {
            factor: Factor::Ferry,
            timestamp: ts,
            passes: true,
            severity: 0.0,
            reason: "no ferries scheduled".to_string(),
            reading: None,
        };
    };

    let (passes, severity, reason) = if distance < buffer {
        let when = if mark.at >= ts {
            format!("in {distance} min")
        } else {
            format!("{distance} min ago")
        };
        (
            false,
            violation((buffer - distance) as f64, buffer as f64),
            format!("ferry {} at {} {when}", mark.direction, mark.terminal),
        )
    } else {
        (
            true,
            caution((2 * buffer - distance) as f64, buffer as f64),
            format!("next ferry movement {distance} min away"),
        )
    };
    FactorAssessment {
        factor: Factor::Ferry,
        timestamp: ts,
        passes,
        severity,
        reason,
        reading: Some(distance as f64),
    }
}

/// Nearest mark and its distance in whole minutes, rounded down so a
/// distance short of the buffer by any number of seconds still fails.
fn nearest_mark(ts: TimePoint, marks: &[FerryMark]) -> Option<(&FerryMark, i64)> {
    // Marks are in time order, so only the neighbours of the insertion point matter
    let split = marks.partition_point(|m| m.at < ts);
    let before = split.checked_sub(1).and_then(|i| marks.get(i));
    let after = marks.get(split);
    [before, after]
        .into_iter()
        .flatten()
        .map(|m| (m, (m.at - ts).num_seconds().abs() / 60))
        .min_by_key(|(_, d)| *d)
}

/// "flooding", "ebbing" or "slack" for a signed current speed.
pub fn current_phase(speed_knots: f64) -> &'static str {
    if speed_knots.abs() < 0.1 {
        "slack"
    } else if speed_knots > 0.0 {
        "flooding"
    } else {
        "ebbing"
    }
}

/// Severity of a failing reading `excess` past its limit.
fn violation(excess: f64, span: f64) -> f64 {
    let ratio = if span > 0.0 { excess / span } else { 1.0 };
    CAUTION_CEILING + (1.0 - CAUTION_CEILING) * ratio.clamp(0.0, 1.0)
}

/// Severity of a passing reading `into_band` past its comfort edge, where
/// the hard limit is `band` further out.
fn caution(into_band: f64, band: f64) -> f64 {
    if into_band <= 0.0 || band <= 0.0 {
        return 0.0;
    }
    CAUTION_CEILING * (into_band / band).clamp(0.0, 1.0)
}
