//! # Pipeline Properties
//!
//! Randomised checks of the invariants every scored day must satisfy,
//! whatever the input looks like.

use super::{calm_conditions, grid, pdt, series_from, test_date};
use crate::aggregate::{aggregate, rank_windows};
use crate::config::ThresholdConfig;
use crate::evaluate::{composite, evaluate, ScoreSeries};
use crate::normalize::{normalize_current, normalize_tide};
use crate::payload::{CurrentRecord, TideRecord};
use crate::{
    CompositeScore, CurrentSample, Factor, FactorAssessment, ProviderKind, Rating, TimePoint,
    WindSample,
};
use chrono::{Duration, NaiveTime, TimeZone};
use proptest::prelude::*;

/// A day of scores from per-point `(suitable, score)` pairs.
fn score_series(points: &[(bool, f64)]) -> ScoreSeries {
    let grid = grid(10);
    let scores = grid
        .timestamps()
        .zip(points)
        .map(|(timestamp, &(suitable, score))| CompositeScore {
            timestamp,
            overall_suitable: suitable,
            score,
            rating: if suitable {
                Rating::Acceptable
            } else {
                Rating::Unsafe
            },
            contributing: Vec::new(),
        })
        .collect();
    ScoreSeries { grid, scores }
}

/// `count` hourly timestamps starting one hour before the test day.
fn hourly(count: usize) -> Vec<TimePoint> {
    let midnight = pdt()
        .from_local_datetime(&test_date().and_time(NaiveTime::MIN))
        .single()
        .unwrap();
    (0..count)
        .map(|i| midnight + Duration::hours(i as i64 - 1))
        .collect()
}

proptest! {
    /// Windows never overlap, come back in start order, meet the minimum
    /// duration and contain only suitable timestamps.
    #[test]
    fn windows_are_disjoint_sorted_and_long_enough(
        points in prop::collection::vec((any::<bool>(), 0.0f64..=1.0), 144),
        min_minutes in 10i64..=120,
    ) {
        let scores = score_series(&points);
        let min = Duration::minutes(min_minutes);
        let windows = aggregate(&scores, min);

        for pair in windows.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
            prop_assert!(!pair[0].overlaps(&pair[1]));
        }
        for window in &windows {
            prop_assert!(window.end >= window.start);
            prop_assert!(window.duration_minutes >= min_minutes);
            prop_assert!(window.peak_score >= window.avg_score - 1e-12);
            let members = scores
                .scores
                .iter()
                .filter(|s| s.timestamp >= window.start && s.timestamp <= window.end);
            for member in members {
                prop_assert!(member.overall_suitable);
            }
        }
    }

    /// Ranking is a deterministic permutation that puts the best average first.
    #[test]
    fn ranking_is_deterministic(
        points in prop::collection::vec((any::<bool>(), 0.0f64..=1.0), 144),
    ) {
        let scores = score_series(&points);
        let windows = aggregate(&scores, Duration::minutes(10));
        let first = rank_windows(&windows);
        let second = rank_windows(&windows.clone());
        prop_assert_eq!(&first, &second);

        let mut sorted = first.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..windows.len()).collect::<Vec<_>>());

        if let Some(&best) = first.first() {
            let top = windows.iter().map(|w| w.avg_score).fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(windows[best].avg_score, top);
        }
    }

    /// Feeding a normalized series back through the normalizer changes nothing.
    #[test]
    fn normalizing_twice_is_identity(
        heights in prop::collection::vec(-3.0f64..14.0, 27),
        currents in prop::collection::vec((-4.0f64..4.0, 0.0f64..360.0), 27),
    ) {
        let grid = grid(10);

        let tide_records: Vec<TideRecord> = hourly(heights.len())
            .into_iter()
            .zip(&heights)
            .map(|(timestamp, &height_ft)| TideRecord { timestamp, height_ft })
            .collect();
        let once = normalize_tide(&tide_records, &grid).unwrap();
        prop_assert_eq!(once.known_count(), grid.len());
        let again_records: Vec<TideRecord> = once
            .known_points()
            .into_iter()
            .map(|(timestamp, height_ft)| TideRecord { timestamp, height_ft })
            .collect();
        prop_assert_eq!(&normalize_tide(&again_records, &grid).unwrap(), &once);

        let current_records: Vec<CurrentRecord> = hourly(currents.len())
            .into_iter()
            .zip(&currents)
            .map(|(timestamp, &(speed_knots, direction_deg))| CurrentRecord {
                timestamp,
                speed_knots,
                direction_deg,
            })
            .collect();
        let once = normalize_current(&current_records, &grid).unwrap();
        let again_records: Vec<CurrentRecord> = once
            .known_points()
            .into_iter()
            .map(|(timestamp, s)| CurrentRecord {
                timestamp,
                speed_knots: s.speed_knots,
                direction_deg: s.direction_deg,
            })
            .collect();
        prop_assert_eq!(&normalize_current(&again_records, &grid).unwrap(), &once);
    }

    /// The composite gate holds exactly when every factor passes.
    #[test]
    fn gate_is_conjunction_of_factors(
        passes in prop::array::uniform4(any::<bool>()),
        severities in prop::array::uniform4(0.0f64..=1.0),
    ) {
        let ts = super::at(12, 0);
        let contributing: Vec<FactorAssessment> = Factor::ALL
            .iter()
            .zip(passes.iter().zip(severities.iter()))
            .map(|(&factor, (&passes, &severity))| FactorAssessment {
                factor,
                timestamp: ts,
                passes,
                severity,
                reason: String::new(),
                reading: Some(severity),
            })
            .collect();
        let score = composite(ts, contributing, &ThresholdConfig::default());
        prop_assert_eq!(score.overall_suitable, passes.iter().all(|p| *p));
        prop_assert!((0.0..=1.0).contains(&score.score));
        prop_assert_eq!(score.rating == Rating::Unsafe, !score.overall_suitable);
    }

    /// Real readings through the evaluator: suitable iff all four pass, and
    /// unknown readings never pass.
    #[test]
    fn evaluated_gate_matches_assessments(
        tide in prop::option::of(-2.0f64..14.0),
        current in prop::option::of(-4.0f64..4.0),
        wind in prop::option::of((0.0f64..25.0, 0.0f64..360.0)),
    ) {
        let grid = grid(60);
        let mut conditions = calm_conditions(&grid);
        conditions.tide = Some(series_from(&grid, ProviderKind::Tide, |_| tide));
        conditions.current = Some(series_from(&grid, ProviderKind::Current, |_| {
            current.map(|speed_knots| CurrentSample { speed_knots, direction_deg: 90.0 })
        }));
        conditions.wind = Some(series_from(&grid, ProviderKind::Wind, |_| {
            wind.map(|(speed_knots, direction_deg)| WindSample { speed_knots, direction_deg })
        }));

        let scores = evaluate(&conditions, &ThresholdConfig::default()).unwrap();
        for score in &scores.scores {
            let all_pass = score.contributing.iter().all(|a| a.passes);
            prop_assert_eq!(score.overall_suitable, all_pass);
            for assessment in &score.contributing {
                if assessment.is_unknown() {
                    prop_assert!(!score.overall_suitable);
                    prop_assert_eq!(assessment.severity, 1.0);
                }
                prop_assert!((0.0..=1.0).contains(&assessment.severity));
            }
        }
        if tide.is_none() || current.is_none() || wind.is_none() {
            prop_assert_eq!(scores.suitable_count(), 0);
        }
    }
}
