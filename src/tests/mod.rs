//! # Cross-Module Test Suite
//!
//! End-to-end checks of the scoring pipeline that do not belong to a single
//! module: worked launch scenarios, the async scheduler against an in-memory
//! provider, and property tests over the pipeline invariants.
//!
//! Shared fixtures live here. Every fixture is for Thursday 2025-07-24 at
//! Pacific Daylight Time (UTC-7).

mod property_tests;

use crate::{
    CurrentSample, FerryEvent, Observation, ProviderKind, Series, TimeGrid, TimePoint, WindSample,
};
use chrono::{FixedOffset, NaiveDate, TimeZone};

pub(crate) fn pdt() -> FixedOffset {
    FixedOffset::west_opt(7 * 3600).unwrap()
}

pub(crate) fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 24).unwrap()
}

/// Local wall-clock time on the test date.
pub(crate) fn at(hour: u32, minute: u32) -> TimePoint {
    pdt()
        .with_ymd_and_hms(2025, 7, 24, hour, minute, 0)
        .single()
        .unwrap()
}

pub(crate) fn grid(interval_minutes: u32) -> TimeGrid {
    TimeGrid::for_date(test_date(), interval_minutes, pdt()).unwrap()
}

/// Series whose value at each grid point comes from `value`.
pub(crate) fn series_from<T>(
    grid: &TimeGrid,
    source: ProviderKind,
    value: impl Fn(TimePoint) -> Option<T>,
) -> Series<T> {
    Series {
        grid: grid.clone(),
        source,
        observations: grid
            .timestamps()
            .map(|timestamp| Observation {
                timestamp,
                value: value(timestamp),
                source,
            })
            .collect(),
    }
}

/// Calm conditions all day: mid tide, gentle flood, light northwesterly,
/// no ferry traffic. Every factor sits inside its comfort band.
pub(crate) fn calm_conditions(grid: &TimeGrid) -> crate::evaluate::AlignedConditions {
    crate::evaluate::AlignedConditions {
        grid: grid.clone(),
        tide: Some(series_from(grid, ProviderKind::Tide, |_| Some(6.0))),
        current: Some(series_from(grid, ProviderKind::Current, |_| {
            Some(CurrentSample {
                speed_knots: 0.5,
                direction_deg: 60.0,
            })
        })),
        wind: Some(series_from(grid, ProviderKind::Wind, |_| {
            Some(WindSample {
                speed_knots: 4.0,
                direction_deg: 315.0,
            })
        })),
        ferry: Some(series_from(grid, ProviderKind::Ferry, |_| {
            Some(Vec::<FerryEvent>::new())
        })),
    }
}
