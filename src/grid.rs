//! # Sampling Grid
//!
//! Every series that takes part in one evaluation is resampled onto the same
//! [`TimeGrid`]: local midnight of the evaluated date, a fixed interval, and
//! enough points to cover 24 hours. Two grids are equal only when start
//! instant, UTC offset, interval and length all agree.

use crate::{LaunchError, TimePoint};
use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "GridFields")]
pub struct TimeGrid {
    start: TimePoint,
    interval_minutes: u32,
    len: usize,
}

/// Wire shape of a grid; deserialized grids go through [`TimeGrid::new`].
#[derive(Deserialize)]
struct GridFields {
    start: TimePoint,
    interval_minutes: u32,
    len: usize,
}

impl TryFrom<GridFields> for TimeGrid {
    type Error = LaunchError;

    fn try_from(fields: GridFields) -> Result<Self, Self::Error> {
        TimeGrid::new(fields.start, fields.interval_minutes, fields.len)
    }
}

impl TimeGrid {
    /// Grid covering one calendar day at `interval_minutes` resolution.
    ///
    /// The interval does not have to divide a day evenly; the last point is
    /// the final one before the next midnight.
    pub fn for_date(
        date: NaiveDate,
        interval_minutes: u32,
        offset: FixedOffset,
    ) -> Result<Self, LaunchError> {
        if interval_minutes == 0 || interval_minutes > MINUTES_PER_DAY {
            return Err(LaunchError::InvalidGrid(format!(
                "interval must be 1..={MINUTES_PER_DAY} minutes, got {interval_minutes}"
            )));
        }
        let midnight = date.and_time(NaiveTime::MIN);
        let start = offset
            .from_local_datetime(&midnight)
            .single()
            .ok_or_else(|| LaunchError::InvalidGrid(format!("no local midnight on {date}")))?;
        let len = MINUTES_PER_DAY.div_ceil(interval_minutes) as usize;
        Self::new(start, interval_minutes, len)
    }

    /// Grid with an explicit start and length.
    pub fn new(start: TimePoint, interval_minutes: u32, len: usize) -> Result<Self, LaunchError> {
        if interval_minutes == 0 {
            return Err(LaunchError::InvalidGrid("interval must be positive".into()));
        }
        if len == 0 {
            return Err(LaunchError::InvalidGrid("grid must have at least one point".into()));
        }
        Ok(TimeGrid {
            start,
            interval_minutes,
            len,
        })
    }

    pub fn start(&self) -> TimePoint {
        self.start
    }

    pub fn offset(&self) -> FixedOffset {
        self.start.offset().fix()
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last grid timestamp.
    pub fn end(&self) -> TimePoint {
        self.timestamp(self.len - 1)
    }

    /// Timestamp of grid point `index`. Indices past the end extrapolate.
    pub fn timestamp(&self, index: usize) -> TimePoint {
        self.start + self.interval() * index as i32
    }

    pub fn timestamps(&self) -> impl Iterator<Item = TimePoint> + '_ {
        (0..self.len).map(move |i| self.timestamp(i))
    }

    /// Index of a timestamp that sits exactly on the grid.
    pub fn index_of(&self, ts: TimePoint) -> Option<usize> {
        let step_ms = self.interval_seconds() * 1000;
        let delta_ms = (ts - self.start).num_milliseconds();
        if delta_ms < 0 || delta_ms % step_ms != 0 {
            return None;
        }
        let index = (delta_ms / step_ms) as usize;
        (index < self.len).then_some(index)
    }

    /// Nearest grid index for an arbitrary instant.
    ///
    /// An instant exactly halfway between two points goes to the later one.
    /// Returns `None` when the nearest point lies outside the grid.
    pub fn snap_index(&self, ts: TimePoint) -> Option<usize> {
        let step = self.interval_seconds();
        let delta = (ts - self.start).num_seconds();
        // floor(delta / step + 1/2) in integer arithmetic
        let index = (2 * delta + step).div_euclid(2 * step);
        if index < 0 {
            return None;
        }
        let index = index as usize;
        (index < self.len).then_some(index)
    }

    fn interval_seconds(&self) -> i64 {
        i64::from(self.interval_minutes) * 60
    }
}

impl PartialEq for TimeGrid {
    fn eq(&self, other: &Self) -> bool {
        // DateTime equality ignores the offset, the grid does not
        self.start == other.start
            && self.offset() == other.offset()
            && self.interval_minutes == other.interval_minutes
            && self.len == other.len
    }
}

impl fmt::Display for TimeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} every {}m x{}",
            self.start.to_rfc3339(),
            self.interval_minutes,
            self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacific() -> FixedOffset {
        FixedOffset::west_opt(7 * 3600).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 24).unwrap()
    }

    #[test]
    fn test_day_grid_has_expected_length() {
        assert_eq!(TimeGrid::for_date(day(), 10, pacific()).unwrap().len(), 144);
        assert_eq!(TimeGrid::for_date(day(), 15, pacific()).unwrap().len(), 96);
        assert_eq!(TimeGrid::for_date(day(), 7, pacific()).unwrap().len(), 206);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(matches!(
            TimeGrid::for_date(day(), 0, pacific()),
            Err(LaunchError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_grid_starts_at_local_midnight() {
        let grid = TimeGrid::for_date(day(), 10, pacific()).unwrap();
        assert_eq!(grid.start().to_rfc3339(), "2025-07-24T00:00:00-07:00");
        assert_eq!(grid.end().to_rfc3339(), "2025-07-24T23:50:00-07:00");
    }

    #[test]
    fn test_snap_index_rounds_ties_toward_future() {
        let grid = TimeGrid::for_date(day(), 10, pacific()).unwrap();
        let at = |h, m, s| {
            pacific()
                .with_ymd_and_hms(2025, 7, 24, h, m, s)
                .single()
                .unwrap()
        };
        assert_eq!(grid.snap_index(at(10, 4, 59)), Some(60));
        assert_eq!(grid.snap_index(at(10, 5, 0)), Some(61));
        assert_eq!(grid.snap_index(at(10, 0, 0)), Some(60));
        // Before midnight but closer to it than to the previous slot
        assert_eq!(
            grid.snap_index(at(0, 0, 0) - Duration::minutes(4)),
            Some(0)
        );
        assert_eq!(grid.snap_index(at(0, 0, 0) - Duration::minutes(6)), None);
        assert_eq!(grid.snap_index(at(23, 56, 0)), None);
    }

    #[test]
    fn test_index_of_requires_exact_alignment() {
        let grid = TimeGrid::for_date(day(), 10, pacific()).unwrap();
        assert_eq!(grid.index_of(grid.timestamp(5)), Some(5));
        assert_eq!(grid.index_of(grid.timestamp(5) + Duration::minutes(1)), None);
        assert_eq!(grid.index_of(grid.timestamp(144)), None);
    }

    #[test]
    fn test_deserialize_rejects_empty_grid() {
        let grid = TimeGrid::for_date(day(), 10, pacific()).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        let back: TimeGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);

        let empty = json.replace("\"len\":144", "\"len\":0");
        assert!(serde_json::from_str::<TimeGrid>(&empty).is_err());
        let zero_interval = json.replace("\"interval_minutes\":10", "\"interval_minutes\":0");
        assert!(serde_json::from_str::<TimeGrid>(&zero_interval).is_err());
    }

    #[test]
    fn test_equality_checks_offset() {
        let a = TimeGrid::for_date(day(), 10, pacific()).unwrap();
        let shifted = TimeGrid::new(
            a.start().with_timezone(&FixedOffset::east_opt(0).unwrap()),
            10,
            a.len(),
        )
        .unwrap();
        assert_ne!(a, shifted);
        assert_eq!(a, a.clone());
    }
}
