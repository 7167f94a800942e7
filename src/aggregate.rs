//! # Window Aggregator
//!
//! Collapses a day of composite scores into launch windows.
//!
//! ## Algorithm
//! 1. Scan scores in timestamp order, extending an open run while
//!    `overall_suitable` holds
//! 2. On the first unsuitable score (or the end of the day) close the run
//! 3. Keep the run only if it covers at least the minimum window duration,
//!    so single-sample flickers never show up as a recommendation
//!
//! Windows come back in start order. [`rank_windows`] gives the best-first
//! order separately so the chronological invariant of the list is kept.

use crate::evaluate::ScoreSeries;
use crate::{CompositeScore, LaunchWindow};
use chrono::Duration;
use std::cmp::Ordering;
use tracing::debug;

/// Extract launch windows from a day of scores, in chronological order.
///
/// A day with no suitable timestamps yields an empty list; that is a
/// normal outcome, not an error.
pub fn aggregate(scores: &ScoreSeries, min_window_duration: Duration) -> Vec<LaunchWindow> {
    let interval = scores.grid.interval();
    let mut windows = Vec::new();
    let mut run: Vec<&CompositeScore> = Vec::new();

    for score in &scores.scores {
        if score.overall_suitable {
            run.push(score);
            continue;
        }
        close_run(&mut run, interval, min_window_duration, &mut windows);
    }
    close_run(&mut run, interval, min_window_duration, &mut windows);

    windows
}

fn close_run(
    run: &mut Vec<&CompositeScore>,
    interval: Duration,
    min_window_duration: Duration,
    windows: &mut Vec<LaunchWindow>,
) {
    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return;
    };
    let duration = last.timestamp - first.timestamp + interval;
    if duration < min_window_duration {
        debug!(
            start = %first.timestamp,
            minutes = duration.num_minutes(),
            "discarding run shorter than minimum window"
        );
        run.clear();
        return;
    }

    let total: f64 = run.iter().map(|s| s.score).sum();
    let peak = run.iter().map(|s| s.score).fold(f64::NEG_INFINITY, f64::max);
    windows.push(LaunchWindow {
        start: first.timestamp,
        end: last.timestamp,
        avg_score: total / run.len() as f64,
        peak_score: peak,
        sample_count: run.len(),
        duration_minutes: duration.num_minutes(),
    });
    run.clear();
}

/// Best-first ordering of windows, as indices into `windows`.
///
/// Higher average score wins; ties go to the longer window, then to the
/// earlier start. The order is fully deterministic.
pub fn rank_windows(windows: &[LaunchWindow]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..windows.len()).collect();
    order.sort_by(|&a, &b| compare_windows(&windows[a], &windows[b]));
    order
}

fn compare_windows(a: &LaunchWindow, b: &LaunchWindow) -> Ordering {
    b.avg_score
        .total_cmp(&a.avg_score)
        .then_with(|| b.duration_minutes.cmp(&a.duration_minutes))
        .then_with(|| a.start.cmp(&b.start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rating, TimeGrid};
    use chrono::{FixedOffset, NaiveDate};

    fn grid() -> TimeGrid {
        let offset = FixedOffset::west_opt(7 * 3600).unwrap();
        TimeGrid::for_date(NaiveDate::from_ymd_opt(2025, 7, 24).unwrap(), 10, offset).unwrap()
    }

    /// Scores where `suitable(i)` decides the gate and the score is fixed.
    fn series(suitable: impl Fn(usize) -> Option<f64>) -> ScoreSeries {
        let grid = grid();
        let scores = grid
            .timestamps()
            .enumerate()
            .map(|(i, timestamp)| {
                let value = suitable(i);
                CompositeScore {
                    timestamp,
                    overall_suitable: value.is_some(),
                    score: value.unwrap_or(0.2),
                    rating: if value.is_some() {
                        Rating::Acceptable
                    } else {
                        Rating::Unsafe
                    },
                    contributing: Vec::new(),
                }
            })
            .collect();
        ScoreSeries { grid, scores }
    }

    #[test]
    fn test_no_suitable_timestamps_yields_no_windows() {
        let windows = aggregate(&series(|_| None), Duration::minutes(30));
        assert!(windows.is_empty());
        assert!(rank_windows(&windows).is_empty());
    }

    #[test]
    fn test_short_runs_are_discarded() {
        // Two samples = 20 minutes of water time
        let s = series(|i| (10..12).contains(&i).then_some(0.9));
        assert!(aggregate(&s, Duration::minutes(30)).is_empty());
        assert_eq!(aggregate(&s, Duration::minutes(20)).len(), 1);
    }

    #[test]
    fn test_run_reaching_end_of_day_is_closed() {
        let s = series(|i| (i >= 140).then_some(0.8));
        let windows = aggregate(&s, Duration::minutes(30));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].sample_count, 4);
        assert_eq!(windows[0].end, grid().end());
        assert_eq!(windows[0].duration_minutes, 40);
    }

    #[test]
    fn test_avg_and_peak() {
        let s = series(|i| match i {
            20 => Some(0.6),
            21 => Some(1.0),
            22 => Some(0.8),
            _ => None,
        });
        let windows = aggregate(&s, Duration::minutes(10));
        assert_eq!(windows.len(), 1);
        assert!((windows[0].avg_score - 0.8).abs() < 1e-12);
        assert_eq!(windows[0].peak_score, 1.0);
    }

    #[test]
    fn test_ranking_tie_breaks_on_duration_then_start() {
        let s = series(|i| match i {
            10..=12 => Some(0.75), // 30 min
            30..=35 => Some(0.75), // 60 min
            50..=55 => Some(0.75), // 60 min, later
            70..=72 => Some(0.95), // best average
            _ => None,
        });
        let windows = aggregate(&s, Duration::minutes(30));
        assert_eq!(windows.len(), 4);
        assert_eq!(rank_windows(&windows), vec![3, 1, 2, 0]);
    }
}
