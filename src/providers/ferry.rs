//! Ferry events from the published timetable.
//!
//! WSF does not offer a keyless live feed, so sailings come from the
//! `[ferry]` section of the configuration. Each departure produces two
//! events: the departure at its origin terminal and the arrival at the far
//! terminal `crossing_minutes` later. Sailings of the neighbouring dates that
//! fall within [`EDGE_MARGIN_HOURS`] of the requested day are included, so a
//! late sailing the evening before still closes the first minutes after
//! midnight.

use super::FetchError;
use crate::config::FerryConfig;
use crate::payload::FerryRecord;
use crate::{FerryEventKind, ProviderKind, TimePoint};
use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use tracing::debug;

/// Hours of the previous and next date's timetable kept around the day
pub const EDGE_MARGIN_HOURS: i64 = 2;

pub struct TimetableFerrySchedule {
    config: FerryConfig,
}

impl TimetableFerrySchedule {
    pub fn new(config: FerryConfig) -> Self {
        TimetableFerrySchedule { config }
    }

    /// Every departure and arrival on `date`, plus those of the adjacent
    /// dates within the edge margin, in timestamp order.
    pub fn sailings(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<FerryRecord>, FetchError> {
        let day_start = local(date, NaiveTime::MIN, offset)?;
        let margin = Duration::hours(EDGE_MARGIN_HOURS);
        let from = day_start - margin;
        let to = day_start + Duration::days(1) + margin;

        let days = [date.pred_opt(), Some(date), date.succ_opt()];
        let mut records = Vec::new();
        for day in days.into_iter().flatten() {
            records.extend(
                self.timetable(day, offset)?
                    .into_iter()
                    .filter(|r| r.timestamp >= from && r.timestamp < to),
            );
        }

        records.sort_by_key(|r| r.timestamp);
        debug!(%date, events = records.len(), "generated ferry timetable events");
        Ok(records)
    }

    fn timetable(&self, date: NaiveDate, offset: FixedOffset) -> Result<Vec<FerryRecord>, FetchError> {
        let crossing = Duration::minutes(i64::from(self.config.crossing_minutes));
        let mut records = Vec::new();

        for route in &self.config.routes {
            let times = route
                .departure_times()
                .map_err(|e| FetchError::parse(ProviderKind::Ferry, e.to_string()))?;
            for time in times {
                let departs = local(date, time, offset)?;
                records.push(FerryRecord {
                    timestamp: departs,
                    terminal: route.departure_terminal.clone(),
                    direction: route.direction.clone(),
                    kind: FerryEventKind::Departure,
                });
                records.push(FerryRecord {
                    timestamp: departs + crossing,
                    terminal: route.arrival_terminal.clone(),
                    direction: route.direction.clone(),
                    kind: FerryEventKind::Arrival,
                });
            }
        }
        Ok(records)
    }
}

fn local(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Result<TimePoint, FetchError> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| FetchError::parse(ProviderKind::Ferry, format!("no local time {time} on {date}")))
}
